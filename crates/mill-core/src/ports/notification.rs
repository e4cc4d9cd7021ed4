//! NotificationDispatcher port - 通知配送の抽象化
//!
//! 「通知するかどうか」は coordinator が決める。ここは配送だけ。

use async_trait::async_trait;

use crate::domain::{BuildResult, Notifier};

/// Delivers one notification. Fire-and-forget from the coordinator's view:
/// delivery failures are the transport's concern.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, notifier: &Notifier, build_result: &BuildResult);
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopNotificationDispatcher {
    async fn notify(&self, _notifier: &Notifier, _build_result: &BuildResult) {}
}
