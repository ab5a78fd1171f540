//! `sysconf apply` - run the commands needed to reach a configuration

use anyhow::{Result, bail};
use declarative::{Document, HistoryStore, Outcome};

use crate::Context;
use crate::builtins;
use crate::cli::ApplyArgs;
use crate::commands::{open_history, resolve_config};
use crate::config;
use crate::engine::{self, ExecuteOptions, differ};
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let path = resolve_config(args.target.config.as_deref())?;
    let desired = config::load(&path)?;
    let mut history = open_history(args.target.last_config.as_deref())?;
    let builtins = builtins::registry()?;

    if !ctx.quiet {
        ui::header(&format!("Applying {}", path.display()));
        let previous = history.load()?.unwrap_or_else(Document::empty);
        let plan = declarative::plan(&previous, &desired, &builtins)?;
        differ::display_plan(&plan, &desired.before, &desired.after, ctx.verbose > 0);
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        on_failure: args.on_failure,
        retries: args.retries,
        verbose: ctx.verbose > 0,
    };
    let report = engine::execute(&desired, &mut history, &builtins, &opts)?;

    match report.outcome {
        Outcome::AllSucceeded => {
            if report.recorded {
                log::info!("Recorded {}", history.current_path().display());
            }
            Ok(())
        }
        // Declined at the confirmation prompt
        Outcome::AbortedBeforeStart if report.summary().failed == 0 => Ok(()),
        Outcome::AbortedBeforeStart => bail!("A before hook failed; nothing was changed"),
        Outcome::PartialFailure { .. } => {
            bail!("{} step(s) failed; history was not updated", report.summary().failed)
        }
    }
}
