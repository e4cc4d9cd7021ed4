//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **Orchestrator**: 外部向け API（project CRUD, build 要求, 結果参照）
//! - **BuildCoordinator**: 1 タスク分の checkout → build → persist → notify
//! - **WorkerGroup**: queue を drain する coordinator ループ群
//! - **ExecutorRegistry**: BuildToolKind → BuildExecutor

pub mod builder;
pub mod coordinator;
pub mod facade;
pub mod notify_policy;
pub mod registry;
pub mod worker;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::coordinator::BuildCoordinator;
pub use self::facade::Orchestrator;
pub use self::notify_policy::{NotifyReason, ON_SUCCESS_KEY, notify_reason};
pub use self::registry::{ExecutorRegistry, RegistryError};
pub use self::worker::WorkerGroup;
