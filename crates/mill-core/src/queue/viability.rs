//! Task viability: which queued build requests are redundant.

use std::collections::HashMap;

use chrono::Duration;

use crate::domain::{BuildProjectTask, ProjectId, TaskId};

/// Per-project debounce over queued (unclaimed) build tasks.
///
/// Tasks are partitioned by project, keeping input order inside each
/// partition. The first task encountered for a project is its anchor and is
/// never discarded. Every later task of that project is discarded when it is
/// not forced and `task.timestamp - anchor.timestamp < required_build_interval`.
///
/// The anchor is the first task *in input order*, not the earliest by
/// timestamp. With an unsorted input the window is measured from whatever
/// task happens to come first; a task older than its anchor yields a negative
/// interval and is always discarded.
#[derive(Debug, Clone, Copy)]
pub struct TaskViabilityEvaluator {
    required_build_interval: Duration,
}

impl TaskViabilityEvaluator {
    pub fn new(required_build_interval: Duration) -> Self {
        Self {
            required_build_interval,
        }
    }

    pub fn required_build_interval(&self) -> Duration {
        self.required_build_interval
    }

    /// Ids of the tasks to discard, in input order. Pure: nothing is mutated.
    pub fn evaluate(&self, tasks: &[BuildProjectTask]) -> Vec<TaskId> {
        let mut anchors: HashMap<ProjectId, &BuildProjectTask> = HashMap::new();
        let mut to_be_removed = Vec::new();

        for task in tasks {
            let anchor = match anchors.get(&task.project_id()) {
                Some(anchor) => *anchor,
                None => {
                    anchors.insert(task.project_id(), task);
                    continue;
                }
            };

            if task.is_forced() {
                continue;
            }

            let interval = task.timestamp() - anchor.timestamp();
            if interval < self.required_build_interval {
                to_be_removed.push(task.task_id());
            }
        }

        to_be_removed
    }
}
