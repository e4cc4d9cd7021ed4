//! mill-core
//!
//! Core building blocks for the mill continuous-build engine.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, project, build result, notifier, task, fetch group, errors）
//! - **ports**: 抽象化レイヤー（ProjectStore, CheckoutProvider, BuildExecutor, NotificationDispatcher, など）
//! - **order**: 依存関係グラフとビルド順序の解決
//! - **queue**: ビルドキューと重複リクエストの間引き
//! - **app**: アプリケーションロジック（builder, coordinator, worker, facade）
//! - **impls**: 実装（InMemoryProjectStore, FileBuildOutputStore）
//! - **config**: figment による設定の読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod order;
pub mod ports;
pub mod queue;
