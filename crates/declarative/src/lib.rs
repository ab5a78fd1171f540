//! # Declarative
//!
//! A reconciliation engine for declared machine state.
//!
//! A configuration document declares, per domain, what should be present on
//! a machine (packages, groups, settings, symlinks). The engine compares it
//! with the last applied document and runs only the shell commands needed to
//! get from one to the other.
//!
//! ## Core Concepts
//!
//! - **Domain**: pure data describing a category of configuration, its
//!   collection shape (list or map), key depth and command templates
//! - **Document**: ordered sections mapping domain names to declared values
//! - **Diff**: flattened per-domain snapshots compared into ordered
//!   add/update/remove actions
//! - **Plan**: every action with its fully expanded command, built before
//!   anything runs
//! - **Cycle**: hooks and actions run one at a time, with failures handed
//!   to a policy and history recorded only on full success
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     reconcile, AbortOnFailure, AutoConfirm, Callbacks, CycleOptions, Document,
//!     DomainDescriptor, MemoryHistory, NoProgress, Registry, ShellRunner,
//! };
//!
//! let builtins = Registry::from_descriptors([DomainDescriptor::list(
//!     "apt",
//!     0,
//!     "sudo apt install -y $value",
//!     "sudo apt remove -y $value",
//! )])?;
//!
//! let desired: Document = serde_yaml_ng::from_str("version: 1\nsections:\n  - apt: [git]\n")?;
//! let mut history = MemoryHistory::new();
//!
//! let report = reconcile(
//!     &desired,
//!     &mut history,
//!     &builtins,
//!     &mut ShellRunner::default(),
//!     Callbacks {
//!         policy: &mut AbortOnFailure,
//!         progress: &mut NoProgress,
//!         confirm: &mut AutoConfirm,
//!     },
//!     &CycleOptions::default(),
//! )?;
//! assert!(report.outcome.is_success());
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`CommandRunner`]: runs an expanded command string
//! - [`FailurePolicy`]: decides what happens after a failed command
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations
//! - [`HistoryStore`]: persists the last applied document
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks, storage layouts, or shells.

pub mod cycle;
pub mod diff;
pub mod document;
pub mod domain;
pub mod error;
pub mod executor;
pub mod template;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use cycle::{
    AbortOnFailure, ApplyReport, AutoConfirm, AutoDecline, Callbacks, ConfirmCallback,
    ContinueOnFailure, Decision, FailurePolicy, HistoryStore, HookPhase, MemoryHistory,
    NoProgress, ProgressCallback, RetryThenAbort, StepReport, StepTarget, plan, reconcile,
};
pub use diff::{DiffSummary, DomainAction, Snapshot, diff, group_by_domain};
pub use document::{Document, SUPPORTED_VERSIONS, Section};
pub use domain::{DomainDefinition, DomainDescriptor, Registry, Templates};
pub use error::{Error, Result};
pub use executor::{CommandRunner, Plan, PlannedStep, ShellRunner, execute, expand};
pub use types::{
    ActionKind, CycleOptions, DomainKind, ExecutionResult, Outcome, StepStatus, StepSummary,
    ValueFormat,
};
pub use value::Value;
