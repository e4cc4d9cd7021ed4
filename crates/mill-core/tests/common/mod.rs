#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use mill_core::app::{App, AppBuilder};
use mill_core::config::MillConfig;
use mill_core::domain::{
    BuildExecution, BuildId, BuildResult, BuildToolKind, CheckoutResult, Notifier, OutputRef,
    Project, ProjectId,
};
use mill_core::impls::{FileBuildOutputStore, InMemoryProjectStore};
use mill_core::queue::{BuildQueue, TaskLease};
use mill_core::ports::{
    BuildExecutor, BuildOutputStore, CheckoutProvider, FixedClock, NotificationDispatcher,
};

/// Checkout that replays scripted results, then succeeds.
#[derive(Default)]
pub struct ScriptedCheckout {
    script: Mutex<VecDeque<CheckoutResult>>,
    /// When set, the store goes away in the middle of the checkout.
    disconnect: Mutex<Option<Arc<InMemoryProjectStore>>>,
}

impl ScriptedCheckout {
    pub fn push(&self, result: CheckoutResult) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn disconnect_during_next_checkout(&self, store: Arc<InMemoryProjectStore>) {
        *self.disconnect.lock().unwrap() = Some(store);
    }
}

#[async_trait]
impl CheckoutProvider for ScriptedCheckout {
    async fn checkout(&self, _project: &Project) -> CheckoutResult {
        if let Some(store) = self.disconnect.lock().unwrap().take() {
            store.set_available(false);
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CheckoutResult::success(vec!["pom.xml".to_string()]))
    }
}

/// Executor that replays scripted executions and records what it built.
#[derive(Default)]
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<BuildExecution>>,
    built: Mutex<Vec<ProjectId>>,
}

impl ScriptedExecutor {
    pub fn push(&self, execution: BuildExecution) {
        self.script.lock().unwrap().push_back(execution);
    }

    pub fn built(&self) -> Vec<ProjectId> {
        self.built.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildExecutor for ScriptedExecutor {
    async fn execute(&self, project: &Project) -> BuildExecution {
        self.built.lock().unwrap().push(project.id);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| BuildExecution::succeeded(format!("built {}", project.name)))
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    sent: Mutex<Vec<(String, BuildId)>>,
}

impl RecordingNotifications {
    pub fn sent(&self) -> Vec<(String, BuildId)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifications {
    async fn notify(&self, notifier: &Notifier, build_result: &BuildResult) {
        self.sent
            .lock()
            .unwrap()
            .push((notifier.notifier_type.clone(), build_result.id));
    }
}

/// Output store whose disk is always broken.
pub struct BrokenOutput;

#[async_trait]
impl BuildOutputStore for BrokenOutput {
    async fn write(&self, _output: OutputRef, _text: &str) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }

    async fn read(&self, _output: OutputRef) -> io::Result<String> {
        Err(io::Error::other("disk gone"))
    }

    async fn remove_project(&self, _project_id: ProjectId) -> io::Result<()> {
        Err(io::Error::other("disk gone"))
    }
}

pub struct Harness {
    pub app: App,
    pub store: Arc<InMemoryProjectStore>,
    pub checkout: Arc<ScriptedCheckout>,
    pub executor: Arc<ScriptedExecutor>,
    pub notifications: Arc<RecordingNotifications>,
    pub clock: Arc<FixedClock>,
    pub output_dir: TempDir,
}

pub fn harness() -> Harness {
    harness_with(MillConfig::default(), None)
}

pub fn harness_with(config: MillConfig, output: Option<Arc<dyn BuildOutputStore>>) -> Harness {
    let store = Arc::new(InMemoryProjectStore::new());
    let checkout = Arc::new(ScriptedCheckout::default());
    let executor = Arc::new(ScriptedExecutor::default());
    let notifications = Arc::new(RecordingNotifications::default());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let output_dir = tempfile::tempdir().unwrap();
    let output = output.unwrap_or_else(|| {
        Arc::new(FileBuildOutputStore::new(output_dir.path())) as Arc<dyn BuildOutputStore>
    });

    let mut builder = AppBuilder::new(config)
        .store(store.clone())
        .checkout(checkout.clone())
        .notifications(notifications.clone())
        .output(output)
        .clock(clock.clone());
    for kind in BuildToolKind::ALL {
        builder = builder.register_executor(kind, executor.clone()).unwrap();
    }
    let app = builder.expect_tools(&BuildToolKind::ALL).build().unwrap();

    Harness {
        app,
        store,
        checkout,
        executor,
        notifications,
        clock,
        output_dir,
    }
}

impl Harness {
    /// Dispatch and run every claimable task on the current task.
    pub async fn drain(&self) -> Vec<BuildResult> {
        let queue = self.app.queue();
        let coordinator = self.app.coordinator();
        let mut results = Vec::new();
        while let Some(lease) = queue.dispatch_next().await.into_lease() {
            let task = lease.task().clone();
            match coordinator.run(&task).await {
                Ok(result) => {
                    results.push(result);
                    lease.complete().await;
                }
                Err(err) => lease.abandon(err.to_string()).await,
            }
        }
        results
    }
}
