//! Notification policy: which notifiers fire for a finished build.

use crate::domain::{BuildResult, Notifier};

/// Notifier configuration key that opts into notifications for plain successes.
pub const ON_SUCCESS_KEY: &str = "on-success";

/// Why a notifier fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyReason {
    Failure,
    /// Success after a failed previous build.
    Recovery,
    /// Success, and the notifier has `on-success = "true"`.
    Success,
}

impl std::fmt::Display for NotifyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotifyReason::Failure => "failure",
            NotifyReason::Recovery => "recovery",
            NotifyReason::Success => "success",
        };
        f.write_str(s)
    }
}

/// `None` means the notifier stays silent.
pub fn notify_reason(
    previous: Option<&BuildResult>,
    current: &BuildResult,
    notifier: &Notifier,
) -> Option<NotifyReason> {
    if !current.success() {
        return Some(NotifyReason::Failure);
    }
    if previous.is_some_and(|p| !p.success()) {
        return Some(NotifyReason::Recovery);
    }
    (notifier.config(ON_SUCCESS_KEY) == Some("true")).then_some(NotifyReason::Success)
}
