//! Execution engine - sysconf-specific callbacks with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    AbortOnFailure, ApplyReport, AutoConfirm, Callbacks, ConfirmCallback, ContinueOnFailure,
    CycleOptions, Decision, Document, ExecutionResult, FailurePolicy, HistoryStore, Outcome,
    ProgressCallback, Registry, RetryThenAbort, ShellRunner, StepReport, StepStatus,
};
use indicatif::ProgressBar;
use std::cell::RefCell;
use std::rc::Rc;

use crate::cli::FailureMode;
use crate::progress;

/// Options for execution (sysconf-specific, includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Failure handling
    pub on_failure: FailureMode,
    /// Extra attempts before aborting, with `FailureMode::Abort`
    pub retries: usize,
    /// Print command output for every step
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            yes: false,
            on_failure: FailureMode::Prompt,
            retries: 0,
            verbose: false,
        }
    }
}

/// Spinner shared between progress reporting and the failure prompt
#[derive(Clone, Default)]
struct ActiveSpinner(Rc<RefCell<Option<ProgressBar>>>);

impl ActiveSpinner {
    fn start(&self, msg: &str) {
        *self.0.borrow_mut() = Some(progress::spinner(msg));
    }

    fn take(&self) -> Option<ProgressBar> {
        self.0.borrow_mut().take()
    }

    /// Clear the spinner so the terminal is free for a prompt
    fn clear(&self) {
        if let Some(pb) = self.take() {
            pb.finish_and_clear();
        }
    }
}

/// Reports each step with a spinner and a final status line
struct ConsoleProgress {
    spinner: ActiveSpinner,
    verbose: bool,
    total: usize,
    position: usize,
}

impl ProgressCallback for ConsoleProgress {
    fn on_cycle_start(&mut self, total: usize) {
        self.total = total;
        println!();
        println!("  {} Applying {} step(s)...", "→".cyan(), total);
    }

    fn on_step_start(&mut self, step: &StepReport) {
        self.position += 1;
        self.spinner.start(&format!(
            "[{}/{}] {}",
            self.position, self.total, step.target
        ));
    }

    fn on_step_complete(&mut self, step: &StepReport) {
        let msg = format!("{}", step.target);
        let pb = self.spinner.take().unwrap_or_else(ProgressBar::hidden);
        match &step.status {
            StepStatus::Succeeded => progress::finish_success(&pb, &msg),
            StepStatus::Accepted => {
                progress::finish_warn(&pb, &format!("{msg} (marked as successful)"));
            }
            StepStatus::Failed => progress::finish_error(&pb, &msg),
            StepStatus::Skipped { reason } => {
                progress::finish_warn(&pb, &format!("{msg} ({reason})"));
            }
        }

        if self.verbose {
            if let Some(result) = &step.result {
                print_output(result);
            }
        }
    }

    fn on_cycle_complete(&mut self, _outcome: &Outcome) {
        self.spinner.clear();
    }
}

/// Confirms through a terminal prompt
struct TerminalConfirm;

impl ConfirmCallback for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> declarative::Result<bool> {
        println!();
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(dialoguer_error)
    }
}

/// Asks the user what to do about each failure
///
/// A step gets at most [`PromptPolicy::MAX_ATTEMPTS`] runs; after that it is
/// aborted without asking again.
struct PromptPolicy {
    spinner: ActiveSpinner,
}

impl PromptPolicy {
    const MAX_ATTEMPTS: usize = 5;
    const CHOICES: [&'static str; 4] = ["Retry", "Skip", "Abort", "Mark as successful"];
}

impl FailurePolicy for PromptPolicy {
    fn decide(
        &mut self,
        step: &StepReport,
        result: &ExecutionResult,
    ) -> declarative::Result<Decision> {
        self.spinner.clear();

        println!();
        println!("  {} An error occurred while running {}:", "✗".red(), step.target);
        println!("    {}", describe_exit(result).red());
        print_output(result);

        if step.attempts >= Self::MAX_ATTEMPTS {
            println!("    {} Giving up after {} attempts", "⚠".yellow(), step.attempts);
            return Ok(Decision::Abort);
        }

        let choice = dialoguer::Select::new()
            .with_prompt("Choose an option")
            .items(&Self::CHOICES)
            .default(0)
            .interact()
            .map_err(dialoguer_error)?;

        let decision = match choice {
            0 => Decision::Retry,
            1 => Decision::Continue,
            3 => Decision::Accept,
            _ => Decision::Abort,
        };

        if decision == Decision::Retry {
            self.spinner
                .start(&format!("{} (attempt {})", step.target, step.attempts + 1));
        }
        Ok(decision)
    }
}

fn dialoguer_error(err: dialoguer::Error) -> declarative::Error {
    match err {
        dialoguer::Error::IO(io) => declarative::Error::Io(io),
    }
}

fn describe_exit(result: &ExecutionResult) -> String {
    match result.exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by a signal".to_string(),
    }
}

fn print_output(result: &ExecutionResult) {
    for line in result.stdout.lines() {
        println!("    {}", line.dimmed());
    }
    for line in result.stderr.lines() {
        println!("    {}", line.red().dimmed());
    }
}

/// Run one apply cycle with terminal UI
pub fn execute(
    desired: &Document,
    history: &mut dyn HistoryStore,
    builtins: &Registry,
    opts: &ExecuteOptions,
) -> Result<ApplyReport> {
    let spinner = ActiveSpinner::default();
    let mut runner = ShellRunner::default();

    let mut progress = ConsoleProgress {
        spinner: spinner.clone(),
        verbose: opts.verbose,
        total: 0,
        position: 0,
    };

    let mut confirm: Box<dyn ConfirmCallback> = if opts.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(TerminalConfirm)
    };

    let mut policy: Box<dyn FailurePolicy> = match opts.on_failure {
        FailureMode::Prompt => Box::new(PromptPolicy { spinner }),
        FailureMode::Abort if opts.retries > 0 => Box::new(RetryThenAbort {
            attempts: opts.retries + 1,
        }),
        FailureMode::Abort => Box::new(AbortOnFailure),
        FailureMode::Continue => Box::new(ContinueOnFailure),
    };

    let report = declarative::reconcile(
        desired,
        history,
        builtins,
        &mut runner,
        Callbacks {
            policy: policy.as_mut(),
            progress: &mut progress,
            confirm: confirm.as_mut(),
        },
        &CycleOptions {
            dry_run: opts.dry_run,
        },
    )?;

    print_summary(&report);
    Ok(report)
}

/// Print final summary
fn print_summary(report: &ApplyReport) {
    let summary = report.summary();
    println!();

    if report.dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return;
    }

    match &report.outcome {
        Outcome::AllSucceeded if report.steps.is_empty() => {
            println!("  {} Already up to date", "✓".green().bold());
        }
        Outcome::AllSucceeded => {
            println!(
                "  {} Configuration applied successfully!",
                "✓".green().bold()
            );
        }
        Outcome::PartialFailure { last_succeeded } => {
            println!("  {} Configuration applied with errors", "⚠".yellow().bold());
            match last_succeeded {
                Some(index) => println!(
                    "    • last action completed before the first failure: #{}",
                    index + 1
                ),
                None => println!("    • no action completed before the first failure"),
            }
        }
        Outcome::AbortedBeforeStart => {
            println!("  {} Aborted, nothing was changed", "✗".red());
        }
    }

    if summary.succeeded > 0 {
        println!("    • {} steps succeeded", summary.succeeded);
    }
    if summary.accepted > 0 {
        println!("    • {} steps marked as successful", summary.accepted);
    }
    if summary.skipped > 0 {
        println!("    • {} steps skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "steps".red());
        for step in report.failures() {
            println!("      - {}", step.target);
        }
    }
    if report.recorded {
        println!("    • history updated");
    } else if !report.steps.is_empty() {
        println!("    • {}", "history left unchanged".dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_exit() {
        assert_eq!(describe_exit(&ExecutionResult::failure(2, "")), "exit code 2");
        let killed = ExecutionResult {
            exit_code: None,
            ..Default::default()
        };
        assert_eq!(describe_exit(&killed), "terminated by a signal");
    }

    #[test]
    fn test_active_spinner_take_clears_slot() {
        let spinner = ActiveSpinner::default();
        let other = spinner.clone();
        spinner.start("working");
        assert!(other.take().is_some());
        assert!(spinner.take().is_none());
    }

    #[test]
    fn test_execute_with_abort_policy() {
        let desired: Document = serde_yaml_ng::from_str(
            "version: 1\ndomains:\n  echo:\n    kind: list\n    add: \"true $value\"\n    remove: \"true $value\"\nsections:\n  - echo: [a, b]\n",
        )
        .unwrap();
        let mut history = declarative::MemoryHistory::new();
        let opts = ExecuteOptions {
            yes: true,
            on_failure: FailureMode::Abort,
            ..Default::default()
        };

        let report = execute(&desired, &mut history, &Registry::new(), &opts).unwrap();
        assert_eq!(report.outcome, Outcome::AllSucceeded);
        assert!(report.recorded);
        assert_eq!(history.current(), Some(&desired));
    }

    #[test]
    fn test_execute_failure_keeps_history() {
        let desired: Document = serde_yaml_ng::from_str(
            "version: 1\ndomains:\n  fail:\n    kind: list\n    add: \"exit 4\"\n    remove: \"true\"\nsections:\n  - fail: [a]\n",
        )
        .unwrap();
        let mut history = declarative::MemoryHistory::new();
        let opts = ExecuteOptions {
            yes: true,
            on_failure: FailureMode::Continue,
            ..Default::default()
        };

        let report = execute(&desired, &mut history, &Registry::new(), &opts).unwrap();
        assert!(matches!(report.outcome, Outcome::PartialFailure { .. }));
        assert!(history.current().is_none());
        assert_eq!(report.steps[0].result.as_ref().unwrap().exit_code, Some(4));
    }
}
