//! In-memory build queue.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use super::{BuildQueue, Dispatch, QueueCounts, TaskLease, TaskViabilityEvaluator};
use crate::domain::{BuildProjectTask, ProjectId, TaskId};

/// In-memory queue state. Every mutation happens under one lock.
struct QueueState {
    /// Unclaimed tasks in enqueue order.
    pending: VecDeque<BuildProjectTask>,

    /// Projects with a dispatched, not yet released task.
    active: HashMap<ProjectId, TaskId>,

    evaluator: TaskViabilityEvaluator,

    counts: QueueCounts,
}

impl QueueState {
    fn new(evaluator: TaskViabilityEvaluator) -> Self {
        Self {
            pending: VecDeque::new(),
            active: HashMap::new(),
            evaluator,
            counts: QueueCounts::default(),
        }
    }

    fn prune(&mut self) -> Vec<BuildProjectTask> {
        let discard: HashSet<TaskId> = self
            .evaluator
            .evaluate(self.pending.make_contiguous())
            .into_iter()
            .collect();
        if discard.is_empty() {
            return Vec::new();
        }

        let mut removed = Vec::with_capacity(discard.len());
        self.pending.retain(|task| {
            if discard.contains(&task.task_id()) {
                removed.push(task.clone());
                false
            } else {
                true
            }
        });

        for task in &removed {
            debug!(task = %task.task_id(), project = %task.project_id(), "discarded redundant build request");
        }
        self.counts.pruned += removed.len();
        removed
    }

    /// Prune and claim in one step, so no task is both pruned and dispatched.
    fn claim_next(&mut self) -> Option<BuildProjectTask> {
        self.prune();

        let index = self
            .pending
            .iter()
            .position(|task| !self.active.contains_key(&task.project_id()))?;
        let task = self.pending.remove(index)?;

        self.active.insert(task.project_id(), task.task_id());
        self.counts.dispatched += 1;
        Some(task)
    }

    fn release(&mut self, task: &BuildProjectTask, completed: bool) {
        if self.active.get(&task.project_id()) == Some(&task.task_id()) {
            self.active.remove(&task.project_id());
        }
        if completed {
            self.counts.completed += 1;
        } else {
            self.counts.abandoned += 1;
        }
    }

    fn counts(&self) -> QueueCounts {
        QueueCounts {
            queued: self.pending.len(),
            active: self.active.len(),
            ..self.counts
        }
    }
}

/// In-memory queue implementation.
///
/// The lock is only held for enqueue / prune / claim / release, never while
/// a build runs.
pub struct InMemoryBuildQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl InMemoryBuildQueue {
    pub fn new(evaluator: TaskViabilityEvaluator) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::new(evaluator))),
            notify: Arc::new(Notify::new()),
        }
    }

    fn lease(&self, task: BuildProjectTask) -> Box<dyn TaskLease> {
        Box::new(InMemoryLease {
            task,
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
            released: false,
        })
    }
}

#[async_trait]
impl BuildQueue for InMemoryBuildQueue {
    async fn enqueue(&self, task: BuildProjectTask) -> TaskId {
        let task_id = task.task_id();
        let project_id = task.project_id();
        let forced = task.is_forced();

        let pruned = {
            let mut state = self.state.lock().await;
            state.pending.push_back(task);
            state.prune().len()
        };

        debug!(task = %task_id, project = %project_id, forced, pruned, "build request enqueued");

        // Notify waiting workers
        self.notify.notify_one();
        task_id
    }

    async fn is_queued(&self, project_id: ProjectId) -> bool {
        let state = self.state.lock().await;
        state.active.contains_key(&project_id)
            || state.pending.iter().any(|t| t.project_id() == project_id)
    }

    async fn prune(&self) -> Vec<BuildProjectTask> {
        let mut state = self.state.lock().await;
        state.prune()
    }

    async fn dispatch_next(&self) -> Dispatch {
        let claimed = {
            let mut state = self.state.lock().await;
            state.claim_next()
        };

        match claimed {
            Some(task) => {
                info!(task = %task.task_id(), project = %task.project_id(), "build task dispatched");
                Dispatch::Task(self.lease(task))
            }
            None => Dispatch::Empty,
        }
    }

    async fn next_task(&self) -> Box<dyn TaskLease> {
        loop {
            if let Dispatch::Task(lease) = self.dispatch_next().await {
                return lease;
            }
            // Woken by enqueue (new task) or release (project no longer active).
            self.notify.notified().await;
        }
    }

    async fn pending(&self) -> Vec<BuildProjectTask> {
        let state = self.state.lock().await;
        state.pending.iter().cloned().collect()
    }

    async fn counts(&self) -> QueueCounts {
        let state = self.state.lock().await;
        state.counts()
    }
}

/// Lease implementation for InMemoryBuildQueue.
struct InMemoryLease {
    task: BuildProjectTask,
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    released: bool,
}

impl InMemoryLease {
    async fn release(&mut self, completed: bool) {
        {
            let mut state = self.state.lock().await;
            state.release(&self.task, completed);
        } // Lock released here
        self.released = true;

        // Another task of the same project may be claimable now.
        self.notify.notify_one();
    }
}

#[async_trait]
impl TaskLease for InMemoryLease {
    fn task(&self) -> &BuildProjectTask {
        &self.task
    }

    async fn complete(self: Box<Self>) {
        let mut lease = self;
        lease.release(true).await;
        debug!(task = %lease.task.task_id(), project = %lease.task.project_id(), "build task completed");
    }

    async fn abandon(self: Box<Self>, reason: String) {
        let mut lease = self;
        lease.release(false).await;
        warn!(
            task = %lease.task.task_id(),
            project = %lease.task.project_id(),
            %reason,
            "build task abandoned"
        );
    }
}

impl Drop for InMemoryLease {
    /// A lease dropped without `complete`/`abandon` (e.g. a panicking worker)
    /// must not leave its project active forever.
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let state = Arc::clone(&self.state);
        let notify = Arc::clone(&self.notify);
        let task = self.task.clone();
        handle.spawn(async move {
            state.lock().await.release(&task, false);
            notify.notify_one();
        });
    }
}
