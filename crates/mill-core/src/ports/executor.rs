//! BuildExecutor port - ビルドツール呼び出しの抽象化
//!
//! BuildToolKind ごとに 1 つの executor を登録する（`app::registry` 参照）。

use async_trait::async_trait;

use crate::domain::{BuildExecution, Project};

/// Runs one build of an already checked-out project.
///
/// Like checkout, a failing build is a `BuildExecution { success: false, .. }`.
/// The returned log is stored out-of-band by the coordinator.
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    async fn execute(&self, project: &Project) -> BuildExecution;
}
