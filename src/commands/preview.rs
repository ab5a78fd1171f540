//! `sysconf preview` - print the commands an apply would run

use anyhow::{Context as AnyhowContext, Result};
use declarative::{Document, HistoryStore};
use serde::Serialize;

use crate::Context;
use crate::builtins;
use crate::cli::PreviewArgs;
use crate::commands::{open_history, resolve_config};
use crate::config::{self, ConfigFormat};
use crate::engine::differ;

#[derive(Serialize)]
struct PreviewJson<'a> {
    before: &'a [String],
    steps: &'a [declarative::PlannedStep],
    after: &'a [String],
}

pub fn run(_ctx: &Context, args: PreviewArgs) -> Result<()> {
    let path = resolve_config(args.target.config.as_deref())?;
    let desired = config::load(&path)?;
    let history = open_history(args.target.last_config.as_deref())?;
    let previous = history.load()?.unwrap_or_else(Document::empty);

    // What apply would record must be representable as history
    ConfigFormat::Yaml
        .render(&desired)
        .context("Configuration cannot be recorded as history")?;

    let plan = declarative::plan(&previous, &desired, &builtins::registry()?)?;

    if args.json {
        let (before, after) = if plan.is_empty() {
            (&[][..], &[][..])
        } else {
            (desired.before.as_slice(), desired.after.as_slice())
        };
        let json = serde_json::to_string_pretty(&PreviewJson {
            before,
            steps: &plan.steps,
            after,
        })?;
        println!("{json}");
    } else {
        print!("{}", differ::render_script(&plan, &desired.before, &desired.after));
    }

    Ok(())
}
