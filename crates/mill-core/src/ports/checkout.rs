//! CheckoutProvider port - SCM checkout の抽象化
//!
//! VCS プロトコルの実装はこのクレートの外にある。

use async_trait::async_trait;

use crate::domain::{CheckoutResult, Project};

/// Checks a project's sources out.
///
/// Failures are reported as `CheckoutResult { success: false, .. }`, not as
/// errors; implementations enforce their own timeouts.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn checkout(&self, project: &Project) -> CheckoutResult;
}
