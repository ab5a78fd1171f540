//! Plan display - sysconf-specific UI

use colored::{ColoredString, Colorize};
use declarative::{ActionKind, DiffSummary, Plan, PlannedStep};

fn symbol(kind: ActionKind) -> ColoredString {
    match kind {
        ActionKind::Add => kind.symbol().green(),
        ActionKind::Update => kind.symbol().yellow(),
        ActionKind::Remove => kind.symbol().red(),
    }
}

/// Display a plan grouped by domain
///
/// With `show_commands`, each action is followed by its expanded command.
pub fn display_plan(plan: &Plan, before: &[String], after: &[String], show_commands: bool) {
    if plan.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    display_hooks("Before", before);

    for (domain, steps) in group_steps(plan) {
        println!("│ {}", domain.bold());
        for step in steps {
            let action = &step.action;
            let target = if action.key_path.is_empty() {
                String::new()
            } else {
                format!("{} ", action.target())
            };
            let value = match &action.previous {
                Some(previous) => format!("{previous} → {}", action.value),
                None => action.value.to_string(),
            };
            println!(
                "│   {} {}{}",
                symbol(action.kind),
                target.dimmed(),
                value
            );
            if show_commands {
                for line in step.command.lines() {
                    println!("│       {}", line.dimmed());
                }
            }
        }
        println!("│");
    }

    display_hooks("After", after);

    let summary = DiffSummary::from_actions(&plan.actions().cloned().collect::<Vec<_>>());
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to update, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn display_hooks(label: &str, hooks: &[String]) {
    if hooks.is_empty() {
        return;
    }
    println!("│ {}", format!("{label} hooks").bold());
    for hook in hooks {
        println!("│   {} {}", "$".cyan(), hook);
    }
    println!("│");
}

/// Planned steps grouped by domain, keeping plan order
fn group_steps(plan: &Plan) -> Vec<(&str, Vec<&PlannedStep>)> {
    let mut groups: Vec<(&str, Vec<&PlannedStep>)> = Vec::new();
    for step in &plan.steps {
        let domain = step.action.domain.as_str();
        match groups.iter_mut().find(|(name, _)| *name == domain) {
            Some((_, group)) => group.push(step),
            None => groups.push((domain, vec![step])),
        }
    }
    groups
}

/// Plan as a shell-script-like listing: a comment per action, then its command
pub fn render_script(plan: &Plan, before: &[String], after: &[String]) -> String {
    if plan.is_empty() {
        return "# No changes required.\n".to_string();
    }

    let mut out = String::new();
    for hook in before {
        out.push_str("# before hook\n");
        out.push_str(hook);
        out.push('\n');
    }
    for step in &plan.steps {
        out.push_str(&format!("# {}\n", step.action.description()));
        out.push_str(&step.command);
        out.push('\n');
    }
    for hook in after {
        out.push_str("# after hook\n");
        out.push_str(hook);
        out.push('\n');
    }
    out
}
