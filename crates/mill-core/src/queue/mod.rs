//! Build queue: viability evaluation and the in-memory queue.

mod memory;
mod viability;

pub use memory::InMemoryBuildQueue;
pub use viability::TaskViabilityEvaluator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{BuildProjectTask, ProjectId, TaskId};

/// A dispatched task. The worker owns this lease and must either `complete`
/// or `abandon` it; until then the project counts as active and no other task
/// of the same project is dispatched.
///
/// Design intent:
/// - Queue manages admission and the per-project active set.
/// - Coordinator executes side effects and reports back through the lease.
#[async_trait]
pub trait TaskLease: Send {
    fn task(&self) -> &BuildProjectTask;

    /// The build ran to a recorded result (success or failure).
    async fn complete(self: Box<Self>);

    /// The build was aborted (e.g. store unavailable). Not re-queued.
    async fn abandon(self: Box<Self>, reason: String);
}

/// Result of a non-blocking dispatch.
pub enum Dispatch {
    Task(Box<dyn TaskLease>),
    Empty,
}

impl Dispatch {
    pub fn into_lease(self) -> Option<Box<dyn TaskLease>> {
        match self {
            Dispatch::Task(lease) => Some(lease),
            Dispatch::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Dispatch::Empty)
    }
}

/// Queue port (interface).
#[async_trait]
pub trait BuildQueue: Send + Sync {
    /// Append a task, then prune. Always succeeds.
    async fn enqueue(&self, task: BuildProjectTask) -> TaskId;

    /// True if a task for the project is pending or active.
    async fn is_queued(&self, project_id: ProjectId) -> bool;

    /// Drop redundant pending tasks; returns what was dropped.
    async fn prune(&self) -> Vec<BuildProjectTask>;

    /// Prune, then claim the first pending task whose project is not active.
    async fn dispatch_next(&self) -> Dispatch;

    /// Like `dispatch_next`, but waits until a task can be claimed.
    async fn next_task(&self) -> Box<dyn TaskLease>;

    /// Pending (unclaimed) tasks in queue order.
    async fn pending(&self) -> Vec<BuildProjectTask>;

    async fn counts(&self) -> QueueCounts;
}

/// Observability snapshot. `queued`/`active` are current sizes, the rest
/// are totals since the queue was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub active: usize,
    pub pruned: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub abandoned: usize,
}
