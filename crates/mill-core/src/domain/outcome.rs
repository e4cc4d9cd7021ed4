//! Outcome model: what the collaborators report and how a build ended.
//!
//! This module is architecture-agnostic: it does not assume queues, workers,
//! or persistence. It only defines the "shape" of results that the
//! coordinator records.

use serde::{Deserialize, Serialize};

/// How a single build ended.
///
/// Serialized as SCREAMING_SNAKE_CASE: SUCCEEDED / CHECKOUT_FAILED / BUILD_FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildOutcome {
    Succeeded,
    CheckoutFailed,
    BuildFailed,
}

impl BuildOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, BuildOutcome::Succeeded)
    }
}

/// Result of one checkout, as reported by the checkout collaborator.
///
/// A project keeps at most one of these; every checkout overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub success: bool,
    pub command_output: String,
    pub provider_message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checked_out_files: Vec<String>,
}

impl CheckoutResult {
    pub fn success(files: Vec<String>) -> Self {
        Self {
            success: true,
            command_output: String::new(),
            provider_message: String::new(),
            checked_out_files: files,
        }
    }

    pub fn failure(provider_message: impl Into<String>) -> Self {
        Self {
            success: false,
            command_output: String::new(),
            provider_message: provider_message.into(),
            checked_out_files: Vec::new(),
        }
    }

    pub fn with_command_output(mut self, output: impl Into<String>) -> Self {
        self.command_output = output.into();
        self
    }
}

/// What the build-execution collaborator returns.
///
/// `log` is handed to the out-of-band output store; it never lands in the
/// BuildResult itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildExecution {
    pub success: bool,
    pub exit_code: i32,
    pub log: String,
}

impl BuildExecution {
    pub fn succeeded(log: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: 0,
            log: log.into(),
        }
    }

    pub fn failed(exit_code: i32, log: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code,
            log: log.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&BuildOutcome::CheckoutFailed).unwrap();
        assert_eq!(json, "\"CHECKOUT_FAILED\"");
    }

    #[test]
    fn checkout_result_keeps_file_order() {
        let result = CheckoutResult::success(vec!["/b".into(), "/a".into()])
            .with_command_output("command output");
        assert!(result.success);
        assert_eq!(result.checked_out_files, vec!["/b", "/a"]);
        assert_eq!(result.command_output, "command output");
    }

    #[test]
    fn failed_execution_keeps_exit_code() {
        let exec = BuildExecution::failed(2, "boom");
        assert!(!exec.success);
        assert_eq!(exec.exit_code, 2);
    }
}
