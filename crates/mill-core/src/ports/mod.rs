//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部の協調者（SCM, ビルドツール, 通知配送, 永続化）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - ProjectStore が source of truth（正本）
//! - Checkout / build の失敗は値として返す（エラーにしない）
//! - ビルドログは BuildOutputStore に out-of-band で保存する

pub mod build_output;
pub mod checkout;
pub mod clock;
pub mod executor;
pub mod id_generator;
pub mod notification;
pub mod store;

pub use self::build_output::BuildOutputStore;
pub use self::checkout::CheckoutProvider;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::executor::BuildExecutor;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notification::{NoopNotificationDispatcher, NotificationDispatcher};
pub use self::store::{ProjectStore, RemovedProject, StoreCounts};
