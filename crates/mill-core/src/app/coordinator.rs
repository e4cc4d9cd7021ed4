//! BuildCoordinator - 1 タスク分のビルドを実行する
//!
//! checkout → build → persist → notify
//!
//! # 設計原則
//! - checkout / build の失敗はデータ（BuildResult に記録して正常終了）
//! - ストア障害はタスクを中断する。リトライはしない（手動で再実行）
//! - ビルドログの書き込み失敗は warn のみ。ビルド自体は失敗扱いにしない
//! - 結果の記録後に中断した場合、プロジェクトを `Error` にはしない
//! - ビルド中に削除されたプロジェクトのログは書いた後に片付ける

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::notify_policy::notify_reason;
use super::registry::ExecutorRegistry;
use crate::domain::{
    BuildOutcome, BuildProjectTask, BuildResult, FetchGroup, MillError, NewBuildResult, Project,
    ProjectState,
};
use crate::ports::{
    BuildOutputStore, CheckoutProvider, Clock, NotificationDispatcher, ProjectStore,
};

/// Exit code recorded when the build never ran because checkout failed.
pub const CHECKOUT_FAILED_EXIT_CODE: i32 = -1;

/// A result appended to the history, not yet settled.
struct Recorded {
    project: Project,
    previous: Option<BuildResult>,
    result: BuildResult,
    log: String,
}

struct Aborted {
    error: MillError,
    /// The result is already in the history.
    recorded: bool,
}

pub struct BuildCoordinator {
    store: Arc<dyn ProjectStore>,
    checkout: Arc<dyn CheckoutProvider>,
    executors: Arc<ExecutorRegistry>,
    notifications: Arc<dyn NotificationDispatcher>,
    output: Arc<dyn BuildOutputStore>,
    clock: Arc<dyn Clock>,
}

impl BuildCoordinator {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        checkout: Arc<dyn CheckoutProvider>,
        executors: Arc<ExecutorRegistry>,
        notifications: Arc<dyn NotificationDispatcher>,
        output: Arc<dyn BuildOutputStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            checkout,
            executors,
            notifications,
            output,
            clock,
        }
    }

    /// Run one task to a recorded result.
    ///
    /// `Err` means the task was aborted. If that happened before its result
    /// was recorded, the project is moved to `Error` on a best-effort basis.
    pub async fn run(&self, task: &BuildProjectTask) -> Result<BuildResult, MillError> {
        let project_id = task.project_id();
        match self.build(task).await {
            Ok(result) => Ok(result),
            Err(Aborted { error, recorded: true }) => {
                warn!(project = %project_id, task = %task.task_id(), error = %error, "build recorded but not settled");
                Err(error)
            }
            Err(Aborted { error, recorded: false }) => {
                warn!(project = %project_id, task = %task.task_id(), error = %error, "build aborted");
                if !error.is_not_found()
                    && let Err(state_err) = self
                        .store
                        .set_project_state(project_id, ProjectState::Error)
                        .await
                {
                    warn!(project = %project_id, error = %state_err, "could not mark aborted project");
                }
                Err(error)
            }
        }
    }

    async fn build(&self, task: &BuildProjectTask) -> Result<BuildResult, Aborted> {
        let recorded = self.record(task).await.map_err(|error| Aborted {
            error,
            recorded: false,
        })?;

        if let Err(error) = self.settle(&recorded).await {
            if error.is_not_found() {
                self.discard_output(&recorded).await;
            }
            return Err(Aborted {
                error,
                recorded: true,
            });
        }
        Ok(recorded.result)
    }

    /// checkout → build → append. Nothing is persisted as history before the
    /// final append.
    async fn record(&self, task: &BuildProjectTask) -> Result<Recorded, MillError> {
        let project_id = task.project_id();
        let project = self.store.get_project(project_id, FetchGroup::Summary).await?;
        let previous = self.store.latest_build_result(project_id).await?;

        self.store
            .set_project_state(project_id, ProjectState::Building)
            .await?;
        let started_at = self.clock.now();
        info!(project = %project_id, name = %project.name, task = %task.task_id(), "build started");

        let checkout = self.checkout.checkout(&project).await;
        self.store
            .set_checkout_result(project_id, checkout.clone())
            .await?;

        let (outcome, exit_code, error, log) = if !checkout.success {
            debug!(project = %project_id, message = %checkout.provider_message, "checkout failed");
            (
                BuildOutcome::CheckoutFailed,
                CHECKOUT_FAILED_EXIT_CODE,
                Some(checkout.provider_message),
                checkout.command_output,
            )
        } else {
            let executor = self.executors.get(project.build_tool).ok_or_else(|| {
                MillError::ConfigurationError(format!(
                    "no executor registered for build tool `{}`",
                    project.build_tool
                ))
            })?;
            let execution = executor.execute(&project).await;
            if execution.success {
                (BuildOutcome::Succeeded, execution.exit_code, None, execution.log)
            } else {
                (
                    BuildOutcome::BuildFailed,
                    execution.exit_code,
                    Some(format!("build exited with code {}", execution.exit_code)),
                    execution.log,
                )
            }
        };

        let result = self
            .store
            .append_build_result(NewBuildResult {
                project_id,
                outcome,
                exit_code,
                started_at,
                ended_at: self.clock.now(),
                error,
                trigger: task.trigger(),
                forced: task.is_forced(),
            })
            .await?;

        Ok(Recorded {
            project,
            previous,
            result,
            log,
        })
    }

    /// log → state → notify, for a result already in the history.
    async fn settle(&self, recorded: &Recorded) -> Result<(), MillError> {
        let project_id = recorded.project.id;
        let result = &recorded.result;

        if let Err(e) = self.output.write(result.output_ref(), &recorded.log).await {
            warn!(project = %project_id, build = %result.id, error = %e, "could not write build output");
        }

        self.store
            .set_project_state(project_id, ProjectState::after(result.outcome))
            .await?;
        info!(project = %project_id, build = %result.id, outcome = ?result.outcome, "build finished");

        self.notify(&recorded.project, recorded.previous.as_ref(), result)
            .await
    }

    /// The project was removed mid-build, possibly before its logs were
    /// dropped. The write above may have recreated them.
    async fn discard_output(&self, recorded: &Recorded) {
        let project_id = recorded.project.id;
        match self.output.remove_project(project_id).await {
            Ok(()) => debug!(project = %project_id, "dropped output of removed project"),
            Err(e) => {
                warn!(project = %project_id, error = %e, "could not remove build output");
            }
        }
    }

    async fn notify(
        &self,
        project: &Project,
        previous: Option<&BuildResult>,
        result: &BuildResult,
    ) -> Result<(), MillError> {
        let detailed = self.store.get_project(project.id, FetchGroup::Detailed).await?;
        for notifier in detailed.notifiers()? {
            if let Some(reason) = notify_reason(previous, result, notifier) {
                debug!(
                    project = %project.id,
                    notifier = %notifier.notifier_type,
                    %reason,
                    "notifying"
                );
                self.notifications.notify(notifier, result).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io;
    use std::ops::Range;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    use crate::domain::{
        BuildExecution, BuildId, BuildToolKind, CheckoutResult, Notifier, NotifierUpdate,
        OutputRef, ProjectId, ProjectSpec, TaskId,
    };
    use crate::impls::{FileBuildOutputStore, InMemoryProjectStore};
    use crate::ports::{
        BuildExecutor, CheckoutProvider, FixedClock, NoopNotificationDispatcher, RemovedProject,
        StoreCounts,
    };

    struct CleanCheckout;

    #[async_trait]
    impl CheckoutProvider for CleanCheckout {
        async fn checkout(&self, _project: &Project) -> CheckoutResult {
            CheckoutResult::success(vec!["build.xml".to_string()])
        }
    }

    struct Succeeds;

    #[async_trait]
    impl BuildExecutor for Succeeds {
        async fn execute(&self, project: &Project) -> BuildExecution {
            BuildExecution::succeeded(format!("built {}", project.name))
        }
    }

    /// Store whose detailed reads fail once armed.
    struct FlakyStore {
        inner: InMemoryProjectStore,
        fail_detailed: AtomicBool,
    }

    #[async_trait]
    impl ProjectStore for FlakyStore {
        async fn add_project(&self, spec: ProjectSpec) -> Result<ProjectId, MillError> {
            self.inner.add_project(spec).await
        }

        async fn update_project(&self, id: ProjectId, spec: ProjectSpec) -> Result<(), MillError> {
            self.inner.update_project(id, spec).await
        }

        async fn remove_project(&self, id: ProjectId) -> Result<RemovedProject, MillError> {
            self.inner.remove_project(id).await
        }

        async fn get_project(&self, id: ProjectId, group: FetchGroup) -> Result<Project, MillError> {
            if group == FetchGroup::Detailed && self.fail_detailed.load(Ordering::SeqCst) {
                return Err(MillError::StoreUnavailable("connection reset".to_string()));
            }
            self.inner.get_project(id, group).await
        }

        async fn list_projects(&self, range: Range<usize>) -> Result<Vec<Project>, MillError> {
            self.inner.list_projects(range).await
        }

        async fn all_projects(&self) -> Result<Vec<Project>, MillError> {
            self.inner.all_projects().await
        }

        async fn set_project_state(
            &self,
            id: ProjectId,
            state: ProjectState,
        ) -> Result<(), MillError> {
            self.inner.set_project_state(id, state).await
        }

        async fn set_checkout_result(
            &self,
            id: ProjectId,
            result: CheckoutResult,
        ) -> Result<(), MillError> {
            self.inner.set_checkout_result(id, result).await
        }

        async fn append_build_result(&self, new: NewBuildResult) -> Result<BuildResult, MillError> {
            self.inner.append_build_result(new).await
        }

        async fn get_build_result(&self, id: BuildId) -> Result<BuildResult, MillError> {
            self.inner.get_build_result(id).await
        }

        async fn latest_build_result(
            &self,
            project_id: ProjectId,
        ) -> Result<Option<BuildResult>, MillError> {
            self.inner.latest_build_result(project_id).await
        }

        async fn list_build_results(
            &self,
            project_id: ProjectId,
        ) -> Result<Vec<BuildResult>, MillError> {
            self.inner.list_build_results(project_id).await
        }

        async fn add_notifier(
            &self,
            project_id: ProjectId,
            notifier_type: &str,
            configuration: BTreeMap<String, String>,
        ) -> Result<Notifier, MillError> {
            self.inner
                .add_notifier(project_id, notifier_type, configuration)
                .await
        }

        async fn get_notifier(
            &self,
            project_id: ProjectId,
            notifier_type: &str,
        ) -> Result<Notifier, MillError> {
            self.inner.get_notifier(project_id, notifier_type).await
        }

        async fn update_notifier(
            &self,
            project_id: ProjectId,
            notifier_type: &str,
            update: NotifierUpdate,
        ) -> Result<Notifier, MillError> {
            self.inner
                .update_notifier(project_id, notifier_type, update)
                .await
        }

        async fn remove_notifier(
            &self,
            project_id: ProjectId,
            notifier_type: &str,
        ) -> Result<(), MillError> {
            self.inner.remove_notifier(project_id, notifier_type).await
        }

        async fn counts(&self) -> Result<StoreCounts, MillError> {
            self.inner.counts().await
        }
    }

    /// Output store whose writes land just after a full project removal
    /// (store rows and log directory) finished.
    struct RemovingOutput {
        files: FileBuildOutputStore,
        store: Arc<InMemoryProjectStore>,
    }

    #[async_trait]
    impl BuildOutputStore for RemovingOutput {
        async fn write(&self, output: OutputRef, text: &str) -> io::Result<()> {
            self.store
                .remove_project(output.project_id)
                .await
                .map_err(io::Error::other)?;
            self.files.remove_project(output.project_id).await?;
            self.files.write(output, text).await
        }

        async fn read(&self, output: OutputRef) -> io::Result<String> {
            self.files.read(output).await
        }

        async fn remove_project(&self, project_id: ProjectId) -> io::Result<()> {
            self.files.remove_project(project_id).await
        }
    }

    fn coordinator(
        store: Arc<dyn ProjectStore>,
        output: Arc<dyn BuildOutputStore>,
        with_executor: bool,
    ) -> BuildCoordinator {
        let mut executors = ExecutorRegistry::new();
        if with_executor {
            executors
                .register(BuildToolKind::Ant, Arc::new(Succeeds))
                .unwrap();
        }
        BuildCoordinator::new(
            store,
            Arc::new(CleanCheckout),
            Arc::new(executors),
            Arc::new(NoopNotificationDispatcher),
            output,
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            )),
        )
    }

    fn task(project_id: ProjectId) -> BuildProjectTask {
        BuildProjectTask::new(
            TaskId::from_ulid(Ulid::new()),
            project_id,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn abort_before_recording_marks_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryProjectStore::new());
        let id = store
            .add_project(ProjectSpec::new("p", BuildToolKind::Ant))
            .await
            .unwrap();
        let coordinator = coordinator(
            store.clone(),
            Arc::new(FileBuildOutputStore::new(dir.path())),
            false,
        );

        let err = coordinator.run(&task(id)).await.unwrap_err();

        assert!(matches!(err, MillError::ConfigurationError(_)));
        let project = store.get_project(id, FetchGroup::Summary).await.unwrap();
        assert_eq!(project.state, ProjectState::Error);
        assert!(store.list_build_results(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_after_recording_keeps_the_settled_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyStore {
            inner: InMemoryProjectStore::new(),
            fail_detailed: AtomicBool::new(false),
        });
        let id = store
            .add_project(ProjectSpec::new("p", BuildToolKind::Ant))
            .await
            .unwrap();
        let coordinator = coordinator(
            store.clone(),
            Arc::new(FileBuildOutputStore::new(dir.path())),
            true,
        );

        store.fail_detailed.store(true, Ordering::SeqCst);
        let err = coordinator.run(&task(id)).await.unwrap_err();

        assert!(matches!(err, MillError::StoreUnavailable(_)));
        let project = store.get_project(id, FetchGroup::Summary).await.unwrap();
        assert_eq!(project.state, ProjectState::CheckedOut);
        let history = store.list_build_results(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].success());
    }

    #[tokio::test]
    async fn project_removed_mid_build_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryProjectStore::new());
        let id = store
            .add_project(ProjectSpec::new("p", BuildToolKind::Ant))
            .await
            .unwrap();
        let coordinator = coordinator(
            store.clone(),
            Arc::new(RemovingOutput {
                files: FileBuildOutputStore::new(dir.path()),
                store: store.clone(),
            }),
            true,
        );

        let err = coordinator.run(&task(id)).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(!dir.path().join(id.value().to_string()).exists());
        assert_eq!(store.counts().await.unwrap(), StoreCounts::default());
    }
}
