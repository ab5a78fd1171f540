//! Apply cycle orchestration and provider traits
//!
//! A cycle loads the previous document from a [`HistoryStore`], diffs it
//! against the desired document, expands every action, then runs hooks and
//! actions strictly one at a time. Everything interactive or persistent is
//! injected through traits so the cycle can run against in-memory fakes:
//!
//! - [`FailurePolicy`]: decides what happens after a failed command
//! - [`ProgressCallback`]: receives step updates
//! - [`ConfirmCallback`]: approves the plan before anything runs
//! - [`HistoryStore`]: reads and records the last applied document

use serde::Serialize;
use std::fmt;

use crate::diff::{self, DomainAction};
use crate::document::Document;
use crate::domain::Registry;
use crate::error::Result;
use crate::executor::{CommandRunner, Plan};
use crate::types::{CycleOptions, ExecutionResult, Outcome, StepStatus, StepSummary};

/// What to do after a command failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leave the step failed and go on with the next one
    Continue,
    /// Run the same command again
    Retry,
    /// Leave the step failed and skip everything after it
    Abort,
    /// Treat the step as done, as if it had succeeded
    Accept,
}

/// Policy consulted whenever a step's command exits unsuccessfully
pub trait FailurePolicy {
    /// Decide how to proceed; `step.attempts` counts runs so far
    fn decide(&mut self, step: &StepReport, result: &ExecutionResult) -> Result<Decision>;
}

/// Progress callback for a cycle
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called once, before the first step runs
    fn on_cycle_start(&mut self, total: usize);

    /// Called before each step's first attempt
    fn on_step_start(&mut self, step: &StepReport);

    /// Called when a step reaches its final status
    fn on_step_complete(&mut self, step: &StepReport);

    /// Called once the outcome is known
    fn on_cycle_complete(&mut self, outcome: &Outcome);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm; `true` proceeds
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// External record of the last successfully applied document
pub trait HistoryStore {
    /// The last applied document, or `None` when nothing was ever applied
    fn load(&self) -> Result<Option<Document>>;

    /// Replace the record with `document`, all or nothing
    fn record(&mut self, document: &Document) -> Result<()>;
}

/// Stop at the first failure
pub struct AbortOnFailure;

impl FailurePolicy for AbortOnFailure {
    fn decide(&mut self, _step: &StepReport, _result: &ExecutionResult) -> Result<Decision> {
        Ok(Decision::Abort)
    }
}

/// Record failures and keep going
pub struct ContinueOnFailure;

impl FailurePolicy for ContinueOnFailure {
    fn decide(&mut self, _step: &StepReport, _result: &ExecutionResult) -> Result<Decision> {
        Ok(Decision::Continue)
    }
}

/// Run each failing command up to `attempts` times, then abort
pub struct RetryThenAbort {
    pub attempts: usize,
}

impl FailurePolicy for RetryThenAbort {
    fn decide(&mut self, step: &StepReport, _result: &ExecutionResult) -> Result<Decision> {
        if step.attempts < self.attempts {
            Ok(Decision::Retry)
        } else {
            Ok(Decision::Abort)
        }
    }
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_cycle_start(&mut self, _total: usize) {}
    fn on_step_start(&mut self, _step: &StepReport) {}
    fn on_step_complete(&mut self, _step: &StepReport) {}
    fn on_cycle_complete(&mut self, _outcome: &Outcome) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// History kept in memory, for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryHistory {
    current: Option<Document>,
    records: usize,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already applied document
    pub fn with_current(document: Document) -> Self {
        Self {
            current: Some(document),
            records: 0,
        }
    }

    pub fn current(&self) -> Option<&Document> {
        self.current.as_ref()
    }

    /// Number of successful `record` calls
    pub fn records(&self) -> usize {
        self.records
    }
}

impl HistoryStore for MemoryHistory {
    fn load(&self) -> Result<Option<Document>> {
        Ok(self.current.clone())
    }

    fn record(&mut self, document: &Document) -> Result<()> {
        self.current = Some(document.clone());
        self.records += 1;
        Ok(())
    }
}

/// Hook list a hook step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
    Before,
    After,
}

/// What a step runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepTarget {
    /// A `before`/`after` command, by position in its list
    Hook { phase: HookPhase, index: usize },
    /// A planned action, by position in the plan
    Action { index: usize, action: DomainAction },
}

impl fmt::Display for StepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hook { phase, index } => {
                let phase = match phase {
                    HookPhase::Before => "before",
                    HookPhase::After => "after",
                };
                write!(f, "{phase} hook #{}", index + 1)
            }
            Self::Action { action, .. } => write!(f, "{}", action.description()),
        }
    }
}

/// Status of one hook or action in a cycle
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub target: StepTarget,
    /// Fully expanded command
    pub command: String,
    /// Times the command was run
    pub attempts: usize,
    pub status: StepStatus,
    /// Result of the last attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

impl StepReport {
    fn new(target: StepTarget, command: String) -> Self {
        Self {
            target,
            command,
            attempts: 0,
            status: StepStatus::Skipped {
                reason: "not run".to_string(),
            },
            result: None,
        }
    }

    /// Index into the plan, for action steps
    pub fn action_index(&self) -> Option<usize> {
        match self.target {
            StepTarget::Action { index, .. } => Some(index),
            StepTarget::Hook { .. } => None,
        }
    }

    pub fn is_before_hook(&self) -> bool {
        matches!(
            self.target,
            StepTarget::Hook {
                phase: HookPhase::Before,
                ..
            }
        )
    }
}

/// Everything a caller needs to report a cycle
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub steps: Vec<StepReport>,
    pub outcome: Outcome,
    pub dry_run: bool,
    /// Whether the desired document was written to history
    pub recorded: bool,
}

impl ApplyReport {
    /// Status counts over every step
    pub fn summary(&self) -> StepSummary {
        let mut summary = StepSummary::default();
        for step in &self.steps {
            summary.add_status(&step.status);
        }
        summary
    }

    /// Steps that ended up failed
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed))
    }

    /// Number of action steps (hooks excluded)
    pub fn action_count(&self) -> usize {
        self.steps.iter().filter(|s| s.action_index().is_some()).count()
    }
}

/// Injected collaborators of one cycle
pub struct Callbacks<'a> {
    pub policy: &'a mut dyn FailurePolicy,
    pub progress: &'a mut dyn ProgressCallback,
    pub confirm: &'a mut dyn ConfirmCallback,
}

/// Validate both documents, diff them and expand every action
///
/// Nothing runs here; any structural problem surfaces before the host is
/// touched.
pub fn plan(previous: &Document, desired: &Document, builtins: &Registry) -> Result<Plan> {
    previous.validate()?;
    desired.validate()?;

    let registry = Registry::for_cycle(builtins, previous, desired)?;
    let actions = diff::diff(previous, desired, &registry)?;
    Plan::build(actions, &registry)
}

/// Run one apply cycle of `desired` against `history`
///
/// Hooks run only when the plan has at least one action. The desired
/// document is recorded only when every step succeeded or was accepted,
/// and an empty plan records it only if it differs from the previous one.
pub fn reconcile(
    desired: &Document,
    history: &mut dyn HistoryStore,
    builtins: &Registry,
    runner: &mut dyn CommandRunner,
    callbacks: Callbacks<'_>,
    options: &CycleOptions,
) -> Result<ApplyReport> {
    let previous = history.load()?.unwrap_or_else(|| {
        log::debug!("No history found, diffing against an empty document");
        Document::empty()
    });

    let plan = plan(&previous, desired, builtins)?;
    if plan.is_empty() {
        log::info!("Nothing to do: desired state matches history");
        if *desired == previous {
            return Ok(ApplyReport {
                steps: Vec::new(),
                outcome: Outcome::AllSucceeded,
                dry_run: options.dry_run,
                recorded: false,
            });
        }
        return finish(desired, history, Vec::new(), Outcome::AllSucceeded, options);
    }

    let mut steps = build_steps(desired, plan);

    if options.dry_run {
        for step in &mut steps {
            step.status = StepStatus::Skipped {
                reason: "dry run".to_string(),
            };
        }
        return finish(desired, history, steps, Outcome::AllSucceeded, options);
    }

    let prompt = format!("Apply {} change(s)?", steps.len());
    if !callbacks.confirm.confirm(&prompt)? {
        log::info!("Apply cycle declined");
        skip_from(&mut steps, 0, "declined");
        return finish(desired, history, steps, Outcome::AbortedBeforeStart, options);
    }

    callbacks.progress.on_cycle_start(steps.len());
    let outcome = run_steps(&mut steps, runner, callbacks.policy, callbacks.progress)?;
    callbacks.progress.on_cycle_complete(&outcome);

    finish(desired, history, steps, outcome, options)
}

/// Lay out before hooks, actions, after hooks
fn build_steps(desired: &Document, plan: Plan) -> Vec<StepReport> {
    let hooks = |phase: HookPhase, commands: &[String]| -> Vec<StepReport> {
        commands
            .iter()
            .enumerate()
            .map(|(index, command)| {
                StepReport::new(StepTarget::Hook { phase, index }, command.clone())
            })
            .collect()
    };

    let mut steps = hooks(HookPhase::Before, &desired.before);
    steps.extend(plan.steps.into_iter().enumerate().map(|(index, planned)| {
        StepReport::new(
            StepTarget::Action {
                index,
                action: planned.action,
            },
            planned.command,
        )
    }));
    steps.extend(hooks(HookPhase::After, &desired.after));
    steps
}

fn skip_from(steps: &mut [StepReport], start: usize, reason: &str) {
    for step in &mut steps[start..] {
        step.status = StepStatus::Skipped {
            reason: reason.to_string(),
        };
    }
}

fn run_steps(
    steps: &mut [StepReport],
    runner: &mut dyn CommandRunner,
    policy: &mut dyn FailurePolicy,
    progress: &mut dyn ProgressCallback,
) -> Result<Outcome> {
    let mut aborted_at = None;

    for position in 0..steps.len() {
        progress.on_step_start(&steps[position]);

        let abort = run_step(&mut steps[position], runner, policy)?;
        progress.on_step_complete(&steps[position]);

        if abort {
            aborted_at = Some(position);
            break;
        }
    }

    if let Some(position) = aborted_at {
        skip_from(steps, position + 1, "aborted");
        if steps[..=position].iter().all(StepReport::is_before_hook) {
            return Ok(Outcome::AbortedBeforeStart);
        }
    }

    Ok(outcome_of(steps))
}

/// Run one step until it succeeds or the policy settles it; `true` aborts
fn run_step(
    step: &mut StepReport,
    runner: &mut dyn CommandRunner,
    policy: &mut dyn FailurePolicy,
) -> Result<bool> {
    loop {
        step.attempts += 1;
        log::info!("Running {}: {}", step.target, step.command);

        let result = runner.run(&step.command).unwrap_or_else(|e| {
            log::warn!("Could not start command: {e}");
            ExecutionResult {
                exit_code: None,
                stdout: String::new(),
                stderr: e.to_string(),
            }
        });

        if result.is_success() {
            step.status = StepStatus::Succeeded;
            step.result = Some(result);
            return Ok(false);
        }

        log::warn!(
            "{} failed (attempt {}, exit {:?})",
            step.target,
            step.attempts,
            result.exit_code
        );
        let decision = policy.decide(step, &result)?;
        log::debug!("Failure policy decided {decision:?}");
        step.result = Some(result);

        match decision {
            Decision::Retry => {}
            Decision::Accept => {
                step.status = StepStatus::Accepted;
                return Ok(false);
            }
            Decision::Continue => {
                step.status = StepStatus::Failed;
                return Ok(false);
            }
            Decision::Abort => {
                step.status = StepStatus::Failed;
                return Ok(true);
            }
        }
    }
}

/// Outcome from final step statuses
fn outcome_of(steps: &[StepReport]) -> Outcome {
    let Some(first_failed) = steps
        .iter()
        .position(|s| matches!(s.status, StepStatus::Failed))
    else {
        return Outcome::AllSucceeded;
    };

    let last_succeeded = steps[..first_failed]
        .iter()
        .filter(|s| s.status.is_success())
        .filter_map(StepReport::action_index)
        .last();

    Outcome::PartialFailure { last_succeeded }
}

fn finish(
    desired: &Document,
    history: &mut dyn HistoryStore,
    steps: Vec<StepReport>,
    outcome: Outcome,
    options: &CycleOptions,
) -> Result<ApplyReport> {
    let recorded = if options.dry_run {
        false
    } else if outcome.is_success() {
        history.record(desired)?;
        log::debug!("Recorded desired document to history");
        true
    } else {
        log::warn!("Cycle did not fully succeed ({outcome:?}); history left unchanged");
        false
    };

    Ok(ApplyReport {
        steps,
        outcome,
        dry_run: options.dry_run,
        recorded,
    })
}
