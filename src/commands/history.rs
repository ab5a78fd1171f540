//! `sysconf history` - list previously applied configurations

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::commands::open_history;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let history = open_history(None)?;
    let archives = history.archives()?;

    if archives.is_empty() {
        ui::info("No configuration has been applied yet");
        return Ok(());
    }

    ui::header("Applied Configurations");
    for (i, entry) in archives.iter().enumerate().rev() {
        let when = entry.applied_at.map_or_else(
            || "unknown time".dimmed().to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        println!("  {} {}", format!("{:>3}.", i + 1).bold(), when);
        if ctx.verbose > 0 {
            ui::dim(&format!("  {}", entry.path.display()));
        }
    }

    println!();
    ui::kv("Directory", &history.dir().display().to_string());
    Ok(())
}
