//! Errors - エラー型と分類
//!
//! Checkout / build の失敗はここには無い。あれは `BuildOutcome` として
//! BuildResult に記録される「データ」であり、呼び出し元に throw しない。

use thiserror::Error;

use super::ids::ProjectId;

/// Which kind of entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    BuildResult,
    Notifier,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Project => "project",
            EntityKind::BuildResult => "build result",
            EntityKind::Notifier => "notifier",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum MillError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// The dependency graph cannot be linearized. `project_id` is on the cycle.
    #[error("dependency cycle detected at {project_id} (cycle: {cycle:?})")]
    CycleDetected {
        project_id: ProjectId,
        cycle: Vec<ProjectId>,
    },

    /// Persistence transport failure. Never retried by the core.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Field outside the fetch group the entity was read with.
    #[error("field `{0}` was not loaded by this fetch")]
    FieldNotLoaded(&'static str),

    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl MillError {
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
