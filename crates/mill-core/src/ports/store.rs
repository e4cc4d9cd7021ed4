//! ProjectStore port - projects, build results, notifiers, checkout results の正本
//!
//! # 設計原則
//! - 読み取りは FetchGroup を明示する（summary では関連を materialize しない）
//! - 書き込みは entity 単位で直列化される
//! - 削除は notifiers → build results → checkout result → project の順で、
//!   単一のアトミックな操作として行う
//! - トランスポート障害は `MillError::StoreUnavailable` で返す（リトライしない）

use std::collections::BTreeMap;
use std::ops::Range;

use async_trait::async_trait;

use crate::domain::{
    BuildId, BuildResult, CheckoutResult, FetchGroup, MillError, NewBuildResult, Notifier,
    NotifierUpdate, Project, ProjectId, ProjectSpec, ProjectState,
};

/// Global collection sizes. Used to audit cascades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub projects: usize,
    pub build_results: usize,
    pub checkout_results: usize,
    pub notifiers: usize,
}

/// What a cascading delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovedProject {
    pub notifiers: usize,
    pub build_results: usize,
    pub checkout_result: bool,
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    async fn add_project(&self, spec: ProjectSpec) -> Result<ProjectId, MillError>;

    /// Replace the editable fields. Identity, state and associations are kept.
    async fn update_project(&self, id: ProjectId, spec: ProjectSpec) -> Result<(), MillError>;

    /// Cascading delete.
    async fn remove_project(&self, id: ProjectId) -> Result<RemovedProject, MillError>;

    async fn get_project(&self, id: ProjectId, group: FetchGroup) -> Result<Project, MillError>;

    /// Summary projects in registration order, sliced by `range` (clamped).
    async fn list_projects(&self, range: Range<usize>) -> Result<Vec<Project>, MillError>;

    /// All summary projects in registration order.
    async fn all_projects(&self) -> Result<Vec<Project>, MillError>;

    async fn set_project_state(&self, id: ProjectId, state: ProjectState)
    -> Result<(), MillError>;

    /// Overwrite the project's single checkout result. A failed checkout also
    /// records its provider message as the project's `checkout_error`.
    async fn set_checkout_result(
        &self,
        id: ProjectId,
        result: CheckoutResult,
    ) -> Result<(), MillError>;

    // ------------------------------------------------------------------
    // Build results
    // ------------------------------------------------------------------

    /// Append to the project's history and assign an id.
    async fn append_build_result(&self, new: NewBuildResult) -> Result<BuildResult, MillError>;

    async fn get_build_result(&self, id: BuildId) -> Result<BuildResult, MillError>;

    /// Newest build of the project, `Ok(None)` if it never built.
    async fn latest_build_result(
        &self,
        project_id: ProjectId,
    ) -> Result<Option<BuildResult>, MillError>;

    /// History oldest first; `NotFound` when the project does not exist.
    async fn list_build_results(&self, project_id: ProjectId)
    -> Result<Vec<BuildResult>, MillError>;

    // ------------------------------------------------------------------
    // Notifiers (addressed by project + type)
    // ------------------------------------------------------------------

    async fn add_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
        configuration: BTreeMap<String, String>,
    ) -> Result<Notifier, MillError>;

    async fn get_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
    ) -> Result<Notifier, MillError>;

    async fn update_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
        update: NotifierUpdate,
    ) -> Result<Notifier, MillError>;

    async fn remove_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
    ) -> Result<(), MillError>;

    async fn counts(&self) -> Result<StoreCounts, MillError>;
}
