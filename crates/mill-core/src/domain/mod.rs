//! Domain model (IDs, projects, build results, notifiers, tasks, errors).

pub mod errors;
pub mod fetch;
pub mod ids;
pub mod outcome;
pub mod project;
pub mod state;
pub mod task;

pub use errors::{EntityKind, MillError};
pub use fetch::{FetchGroup, Fetched};
pub use ids::{BuildId, NotifierId, ProjectId, TaskId};
pub use outcome::{BuildExecution, BuildOutcome, CheckoutResult};
pub use project::{
    BuildResult, BuildToolKind, NewBuildResult, Notifier, NotifierUpdate, OutputRef, Project,
    ProjectSpec,
};
pub use state::ProjectState;
pub use task::{BuildProjectTask, BuildTrigger};
