//! Project state machine.

use serde::{Deserialize, Serialize};

use super::outcome::BuildOutcome;

/// Project state.
///
/// State transitions:
/// - New -> Building -> CheckedOut (build succeeded)
/// - New -> Building -> Failed (build ran and failed)
/// - New -> Building -> Error (checkout failed, or the build was aborted)
/// - CheckedOut / Failed / Error -> Building (next build)
/// - any -> CheckedOut (a standalone checkout succeeded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    /// Registered, never checked out.
    New,

    /// Sources are checked out and the last build (if any) succeeded.
    CheckedOut,

    /// A coordinator currently owns this project.
    Building,

    /// The last build ran and failed.
    Failed,

    /// Checkout failed or the last build was aborted.
    Error,
}

impl ProjectState {
    /// State a project settles in after a recorded build outcome.
    pub fn after(outcome: BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::Succeeded => ProjectState::CheckedOut,
            BuildOutcome::BuildFailed => ProjectState::Failed,
            BuildOutcome::CheckoutFailed => ProjectState::Error,
        }
    }
}
