use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ProjectId, TaskId};

/// Why a build was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BuildTrigger {
    Manual,
    Scheduled,
    /// Cascaded from a build of the given upstream project.
    Dependency { upstream: ProjectId },
}

impl fmt::Display for BuildTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTrigger::Manual => f.write_str("manual"),
            BuildTrigger::Scheduled => f.write_str("scheduled"),
            BuildTrigger::Dependency { upstream } => write!(f, "dependency({upstream})"),
        }
    }
}

/// A pending request to build one project.
///
/// Created on enqueue, consumed on dispatch or discarded by pruning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProjectTask {
    task_id: TaskId,
    project_id: ProjectId,
    timestamp: DateTime<Utc>,
    forced: bool,
    trigger: Option<BuildTrigger>,
}

impl BuildProjectTask {
    pub fn new(task_id: TaskId, project_id: ProjectId, timestamp: DateTime<Utc>) -> Self {
        Self {
            task_id,
            project_id,
            timestamp,
            forced: false,
            trigger: None,
        }
    }

    pub fn forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }

    pub fn with_trigger(mut self, trigger: BuildTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn trigger(&self) -> Option<BuildTrigger> {
        self.trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    #[test]
    fn builder_sets_force_and_trigger() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let task = BuildProjectTask::new(TaskId::from_ulid(Ulid::new()), ProjectId::new(1), at)
            .forced(true)
            .with_trigger(BuildTrigger::Scheduled);

        assert!(task.is_forced());
        assert_eq!(task.trigger(), Some(BuildTrigger::Scheduled));
        assert_eq!(task.timestamp(), at);
    }

    #[test]
    fn dependency_trigger_names_upstream() {
        let trigger = BuildTrigger::Dependency {
            upstream: ProjectId::new(5),
        };
        assert_eq!(trigger.to_string(), "dependency(project-5)");
    }
}
