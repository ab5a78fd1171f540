//! Core types for declarative reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Output;

/// Shape of a domain's declared collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainKind {
    /// Entries are identified by their value (packages, groups)
    #[default]
    List,
    /// Entries are identified by their key path (settings)
    Map,
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
        }
    }
}

/// Kind of a planned change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Update,
    Remove,
}

impl ActionKind {
    /// Verb used in human-readable descriptions
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Update => "Update",
            Self::Remove => "Remove",
        }
    }

    /// Plan symbol, as printed in diffs
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Update => "~",
            Self::Remove => "-",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// How `$value` is rendered into a command template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    /// Scalars verbatim, nested values as compact JSON
    #[default]
    Plain,
    /// GVariant text, as read by `dconf` and `gsettings`
    Gvariant,
}

/// Exit status and captured streams of one command
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for ExecutionResult {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl ExecutionResult {
    /// A successful result with no output
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    /// A failed result with the given exit code and stderr
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Check if the command exited with status zero
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Convert a failure into a [`CommandExecution`](crate::Error::CommandExecution) error
    pub fn check(&self, command: &str) -> crate::Result<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(crate::Error::CommandExecution {
            command: command.to_string(),
            exit_code: self.exit_code,
            stderr: self.stderr.clone(),
        })
    }
}

/// Final status of one step in a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Command exited successfully
    Succeeded,
    /// Command failed but the policy accepted it as done
    Accepted,
    /// Command failed and the policy moved on
    Failed,
    /// Step never ran (dry run, or an earlier abort)
    Skipped { reason: String },
}

impl StepStatus {
    /// Whether the step counts as done for history purposes
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Accepted)
    }
}

/// Aggregate result of one apply cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Every hook and action succeeded (or was accepted)
    AllSucceeded,
    /// Something failed; `last_succeeded` is the index of the last action
    /// that completed before the first failure, if any
    PartialFailure { last_succeeded: Option<usize> },
    /// Nothing ran: confirmation was declined or a before hook aborted
    AbortedBeforeStart,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::AllSucceeded)
    }
}

/// Counts of step statuses, for the final report line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepSummary {
    pub succeeded: usize,
    pub accepted: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StepSummary {
    /// Add a status to the summary
    pub fn add_status(&mut self, status: &StepStatus) {
        match status {
            StepStatus::Succeeded => self.succeeded += 1,
            StepStatus::Accepted => self.accepted += 1,
            StepStatus::Failed => self.failed += 1,
            StepStatus::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Total number of steps counted
    pub fn total(&self) -> usize {
        self.succeeded + self.accepted + self.failed + self.skipped
    }

    /// Check if nothing failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Options for one apply cycle
#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    /// Plan and report, but run nothing and record nothing
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_check() {
        assert!(ExecutionResult::success().check("true").is_ok());

        let err = ExecutionResult::failure(2, "nope").check("false").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::CommandExecution {
                exit_code: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_signal_is_not_success() {
        let result = ExecutionResult {
            exit_code: None,
            ..Default::default()
        };
        assert!(!result.is_success());
    }

    #[test]
    fn test_step_summary() {
        let mut summary = StepSummary::default();
        summary.add_status(&StepStatus::Succeeded);
        summary.add_status(&StepStatus::Accepted);
        summary.add_status(&StepStatus::Skipped {
            reason: "dry run".into(),
        });
        assert_eq!(summary.total(), 3);
        assert!(summary.is_success());

        summary.add_status(&StepStatus::Failed);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_kind_serde_names() {
        let kind: DomainKind = serde_json::from_str("\"map\"").unwrap();
        assert_eq!(kind, DomainKind::Map);
        let format: ValueFormat = serde_json::from_str("\"gvariant\"").unwrap();
        assert_eq!(format, ValueFormat::Gvariant);
    }
}
