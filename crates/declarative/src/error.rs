//! Error types for reconciliation.
//!
//! Structural errors (unknown domains, missing templates, malformed
//! documents) are raised before any command runs. Command failures are
//! normally carried as data in [`ExecutionResult`](crate::ExecutionResult);
//! [`Error::CommandExecution`] exists for callers that want `?` semantics.

use thiserror::Error;

use crate::types::ActionKind;

/// Errors that can occur while planning or executing a cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// A section or action references a domain nobody registered
    #[error("unknown domain: {name}")]
    UnknownDomain {
        /// Name of the unregistered domain
        name: String,
    },

    /// A domain name was registered twice
    #[error("domain already registered: {name}")]
    DuplicateDomain {
        /// Name of the clashing domain
        name: String,
    },

    /// A descriptor has no template for the action kind it must run
    #[error("domain '{domain}' has no {kind} template")]
    MissingTemplate {
        /// Domain lacking the template
        domain: String,
        /// Action kind that needed it
        kind: ActionKind,
    },

    /// Document version is not understood
    #[error("unsupported config version {found} (supported: {supported:?})")]
    UnsupportedVersion {
        /// Version declared in the document
        found: u32,
        /// Versions this build can read
        supported: &'static [u32],
    },

    /// The same domain appears twice in one section
    #[error("domain '{domain}' declared more than once in section {section}")]
    DuplicateSectionDomain {
        /// Zero-based section index
        section: usize,
        /// Repeated domain name
        domain: String,
    },

    /// A user-declared domain definition is inconsistent
    #[error("invalid domain '{name}': {reason}")]
    InvalidDomain {
        /// Domain name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Declared data does not match the domain's kind and depth
    #[error("domain '{domain}' at [{path}]: {message}")]
    ShapeMismatch {
        /// Domain whose data is malformed
        domain: String,
        /// Key path reached before the mismatch, dot separated
        path: String,
        /// Description of the mismatch
        message: String,
    },

    /// Two sections assign different values to the same map key path
    #[error("domain '{domain}' key [{path}] has conflicting values across sections")]
    ConflictingValue {
        /// Domain name
        domain: String,
        /// Conflicting key path, dot separated
        path: String,
    },

    /// A list item is declared more than once under the same key path
    #[error("domain '{domain}' declares '{value}' more than once under [{path}]")]
    DuplicateEntry {
        /// Domain name
        domain: String,
        /// Key path, dot separated
        path: String,
        /// Rendered duplicate item
        value: String,
    },

    /// An expanded command exited unsuccessfully
    #[error("command failed with {}: {command}{}", exit_label(.exit_code), stderr_suffix(.stderr))]
    CommandExecution {
        /// Expanded command text
        command: String,
        /// Exit code, if the process exited normally
        exit_code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The history store could not be read or written
    #[error("history store: {message}")]
    History {
        /// Store-specific description
        message: String,
    },

    /// The command runner could not spawn a process
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ({trimmed})")
    }
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_execution_message() {
        let err = Error::CommandExecution {
            command: "false".into(),
            exit_code: Some(1),
            stderr: "  boom\n".into(),
        };
        assert_eq!(err.to_string(), "command failed with exit code 1: false (boom)");

        let err = Error::CommandExecution {
            command: "sleep 10".into(),
            exit_code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "command failed with a signal: sleep 10");
    }

    #[test]
    fn test_missing_template_message() {
        let err = Error::MissingTemplate {
            domain: "apt".into(),
            kind: ActionKind::Update,
        };
        assert_eq!(err.to_string(), "domain 'apt' has no update template");
    }
}
