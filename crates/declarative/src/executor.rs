//! Action execution: template expansion and command running
//!
//! A [`Plan`] expands every action up front, so a missing template or an
//! unregistered domain is reported before the first command touches the
//! host. Running a step goes through a [`CommandRunner`], which makes the
//! executor testable without a shell.

use serde::Serialize;
use std::process::{Command, Stdio};

use crate::diff::DomainAction;
use crate::domain::{DomainDescriptor, Registry};
use crate::error::Result;
use crate::template;
use crate::types::ExecutionResult;

/// Capability to run one command string
///
/// Implement this trait to control how expanded commands reach the host.
pub trait CommandRunner {
    /// Run a command to completion, capturing its exit status and output
    ///
    /// A non-zero exit is reported in the result, not as an error. Errors
    /// are reserved for failing to start the command at all.
    fn run(&mut self, command: &str) -> Result<ExecutionResult>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, command: &str) -> Result<ExecutionResult> {
        (**self).run(command)
    }
}

/// Runs commands through a POSIX shell (`sh -c` by default)
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command: &str) -> Result<ExecutionResult> {
        log::debug!("Running: {} -c {:?}", self.shell, command);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .output()?;

        let result = ExecutionResult::from(output);
        if !result.is_success() {
            log::debug!("Command exited with {:?}: {}", result.exit_code, result.stderr.trim());
        }
        Ok(result)
    }
}

/// Expand the command for `action` using its descriptor's template
pub fn expand(action: &DomainAction, descriptor: &DomainDescriptor) -> Result<String> {
    let template = descriptor.template(action.kind)?;
    Ok(template::expand(template, action, descriptor.format()))
}

/// Expand and run a single action
pub fn execute<R: CommandRunner + ?Sized>(
    action: &DomainAction,
    descriptor: &DomainDescriptor,
    runner: &mut R,
) -> Result<ExecutionResult> {
    let command = expand(action, descriptor)?;
    runner.run(&command)
}

/// An action paired with its fully expanded command
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub action: DomainAction,
    pub command: String,
}

/// Ordered, fully expanded actions for one cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub steps: Vec<PlannedStep>,
}

impl Plan {
    /// Expand every action against `registry`
    ///
    /// Fails on the first action whose domain is unknown or whose template
    /// is missing; nothing has run at that point.
    pub fn build(actions: Vec<DomainAction>, registry: &Registry) -> Result<Self> {
        let mut steps = Vec::with_capacity(actions.len());
        for action in actions {
            let descriptor = registry.resolve(&action.domain)?;
            let command = expand(&action, descriptor)?;
            steps.push(PlannedStep { action, command });
        }
        Ok(Self { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// The planned actions, in execution order
    pub fn actions(&self) -> impl Iterator<Item = &DomainAction> {
        self.steps.iter().map(|s| &s.action)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::Templates;
    use crate::error::Error;
    use crate::types::{ActionKind, DomainKind, ValueFormat};
    use crate::value::Value;
    use std::collections::VecDeque;

    /// Records every command and replays scripted results
    #[derive(Default)]
    pub(crate) struct RecordingRunner {
        pub commands: Vec<String>,
        pub results: VecDeque<ExecutionResult>,
    }

    impl RecordingRunner {
        pub fn with_results(results: impl IntoIterator<Item = ExecutionResult>) -> Self {
            Self {
                commands: Vec::new(),
                results: results.into_iter().collect(),
            }
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&mut self, command: &str) -> Result<ExecutionResult> {
            self.commands.push(command.to_string());
            Ok(self.results.pop_front().unwrap_or_else(ExecutionResult::success))
        }
    }

    fn apt() -> DomainDescriptor {
        DomainDescriptor::list("apt", 0, "sudo apt install -y $value", "sudo apt remove -y $value")
    }

    fn add(domain: &str, value: &str) -> DomainAction {
        DomainAction {
            domain: domain.to_string(),
            kind: ActionKind::Add,
            key_path: Vec::new(),
            value: Value::from(value),
            previous: None,
        }
    }

    #[test]
    fn test_execute_runs_expanded_command() {
        let mut runner = RecordingRunner::default();
        let result = execute(&add("apt", "git"), &apt(), &mut runner).unwrap();

        assert!(result.is_success());
        assert_eq!(runner.commands, vec!["sudo apt install -y git"]);
    }

    #[test]
    fn test_execute_surfaces_exit_status() {
        let mut runner = RecordingRunner::with_results([ExecutionResult::failure(100, "E: no")]);
        let result = execute(&add("apt", "nope"), &apt(), &mut runner).unwrap();

        assert_eq!(result.exit_code, Some(100));
        assert_eq!(result.stderr, "E: no");
    }

    #[test]
    fn test_plan_rejects_missing_template_before_running() {
        let read_only = DomainDescriptor::new(
            "ro",
            DomainKind::List,
            0,
            Templates {
                add: Some("echo $value".into()),
                ..Default::default()
            },
            ValueFormat::Plain,
        )
        .unwrap();
        let registry = Registry::from_descriptors([apt(), read_only]).unwrap();

        let mut remove = add("ro", "x");
        remove.kind = ActionKind::Remove;

        let err = Plan::build(vec![add("apt", "git"), remove], &registry).unwrap_err();
        assert!(matches!(err, Error::MissingTemplate { .. }));
    }

    #[test]
    fn test_plan_rejects_unknown_domain() {
        let registry = Registry::from_descriptors([apt()]).unwrap();
        let err = Plan::build(vec![add("brew", "git")], &registry).unwrap_err();
        assert!(matches!(err, Error::UnknownDomain { .. }));
    }

    #[test]
    fn test_plan_keeps_order() {
        let registry = Registry::from_descriptors([apt()]).unwrap();
        let plan = Plan::build(vec![add("apt", "b"), add("apt", "a")], &registry).unwrap();

        let commands: Vec<&str> = plan.steps.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["sudo apt install -y b", "sudo apt install -y a"]);
        assert_eq!(plan.actions().count(), 2);
    }

    #[test]
    fn test_shell_runner() {
        let mut runner = ShellRunner::default();

        let ok = runner.run("printf hello").unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.stdout, "hello");

        let failed = runner.run("echo oops >&2; exit 3").unwrap();
        assert_eq!(failed.exit_code, Some(3));
        assert_eq!(failed.stderr.trim(), "oops");
    }

    #[test]
    fn test_gvariant_value_with_apostrophe_stays_one_shell_word() {
        let settings = DomainDescriptor::map(
            "settings",
            1,
            "printf '%s' '$value'",
            "printf '%s' '$value'",
            "true",
        )
        .with_format(ValueFormat::Gvariant);
        let mut action = add("settings", "file:///home/me/it's.png");
        action.key_path = vec!["/picture-uri".to_string()];

        let result = execute(&action, &settings, &mut ShellRunner::default()).unwrap();
        assert!(result.is_success(), "{}", result.stderr);
        assert_eq!(result.stdout, r#""file:///home/me/it\u0027s.png""#);
    }
}
