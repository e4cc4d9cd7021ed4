//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 設計原則
//! - 起動時検証（Fail-fast）: 期待される build tool の executor が揃っていなければ build() が失敗する
//! - store / output / clock / 通知は省略可能（開発用のデフォルトを使う）
//! - 設定値は MillConfig から明示的に渡す（グローバル状態を持たない）

use std::sync::Arc;

use tracing::info;

use super::coordinator::BuildCoordinator;
use super::facade::Orchestrator;
use super::registry::{ExecutorRegistry, RegistryError};
use super::worker::WorkerGroup;
use crate::config::MillConfig;
use crate::domain::BuildToolKind;
use crate::impls::{FileBuildOutputStore, InMemoryProjectStore};
use crate::ports::{
    BuildExecutor, BuildOutputStore, CheckoutProvider, Clock, IdGenerator,
    NoopNotificationDispatcher, NotificationDispatcher, ProjectStore, SystemClock, UlidGenerator,
};
use crate::queue::{BuildQueue, InMemoryBuildQueue, TaskViabilityEvaluator};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(config)
///     .checkout(Arc::new(MyCheckout))
///     .register_executor(BuildToolKind::Maven2, Arc::new(MavenExecutor))?
///     .expect_tools(&[BuildToolKind::Maven2])
///     .build()?;
/// let workers = app.start_workers();
/// ```
pub struct AppBuilder {
    config: MillConfig,
    executors: ExecutorRegistry,
    expected_tools: Option<Vec<BuildToolKind>>,
    store: Option<Arc<dyn ProjectStore>>,
    checkout: Option<Arc<dyn CheckoutProvider>>,
    notifications: Option<Arc<dyn NotificationDispatcher>>,
    output: Option<Arc<dyn BuildOutputStore>>,
    clock: Option<Arc<dyn Clock>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing build tools: {0:?}. These tools were expected but no executor is registered.")]
    MissingBuildTools(Vec<BuildToolKind>),

    #[error("No checkout provider configured")]
    MissingCheckoutProvider,
}

impl AppBuilder {
    pub fn new(config: MillConfig) -> Self {
        Self {
            config,
            executors: ExecutorRegistry::new(),
            expected_tools: None,
            store: None,
            checkout: None,
            notifications: None,
            output: None,
            clock: None,
        }
    }

    pub fn register_executor(
        mut self,
        kind: BuildToolKind,
        executor: Arc<dyn BuildExecutor>,
    ) -> Result<Self, RegistryError> {
        self.executors.register(kind, executor)?;
        Ok(self)
    }

    /// build() 時に「期待集合 ⊆ 登録済み集合」をチェックする
    pub fn expect_tools(mut self, tools: &[BuildToolKind]) -> Self {
        self.expected_tools = Some(tools.to_vec());
        self
    }

    pub fn store(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn checkout(mut self, checkout: Arc<dyn CheckoutProvider>) -> Self {
        self.checkout = Some(checkout);
        self
    }

    pub fn notifications(mut self, notifications: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn output(mut self, output: Arc<dyn BuildOutputStore>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected_tools) = &self.expected_tools {
            let registered = self.executors.registered_kinds();
            let missing: Vec<BuildToolKind> = expected_tools
                .iter()
                .filter(|kind| !registered.contains(kind))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingBuildTools(missing));
            }
        }
        let checkout = self.checkout.ok_or(BuildError::MissingCheckoutProvider)?;

        let store: Arc<dyn ProjectStore> = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryProjectStore::new()) as Arc<dyn ProjectStore>);
        let output: Arc<dyn BuildOutputStore> = self.output.unwrap_or_else(|| {
            Arc::new(FileBuildOutputStore::new(self.config.output.directory.clone()))
                as Arc<dyn BuildOutputStore>
        });
        let notifications: Arc<dyn NotificationDispatcher> = self
            .notifications
            .unwrap_or_else(|| Arc::new(NoopNotificationDispatcher) as Arc<dyn NotificationDispatcher>);
        let clock: Arc<dyn Clock> = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));

        let evaluator =
            TaskViabilityEvaluator::new(self.config.queue.required_build_interval());
        let queue: Arc<dyn BuildQueue> = Arc::new(InMemoryBuildQueue::new(evaluator));

        let coordinator = Arc::new(BuildCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&checkout),
            Arc::new(self.executors),
            notifications,
            Arc::clone(&output),
            Arc::clone(&clock),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            store,
            Arc::clone(&queue),
            checkout,
            output,
            clock,
            ids,
        ));

        Ok(App {
            config: self.config,
            queue,
            coordinator,
            orchestrator,
        })
    }
}

/// App はワイヤリング済みのアプリケーション
pub struct App {
    config: MillConfig,
    queue: Arc<dyn BuildQueue>,
    coordinator: Arc<BuildCoordinator>,
    orchestrator: Arc<Orchestrator>,
}

impl App {
    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn coordinator(&self) -> Arc<BuildCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn queue(&self) -> Arc<dyn BuildQueue> {
        Arc::clone(&self.queue)
    }

    pub fn config(&self) -> &MillConfig {
        &self.config
    }

    /// Spawn `workers.count` coordinator loops draining the queue.
    pub fn start_workers(&self) -> WorkerGroup {
        let n = self.config.workers.count;
        info!(workers = n, "starting build workers");
        WorkerGroup::spawn(n, self.queue(), self.coordinator())
    }
}
