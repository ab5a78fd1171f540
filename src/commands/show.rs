//! `sysconf show` - print an applied configuration

use anyhow::Result;
use std::path::Path;

use crate::Context;
use crate::commands::open_history;
use crate::config::{self, ConfigFormat};
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => paths::expand(&path.to_string_lossy()),
        None => open_history(None)?.current_path(),
    };

    let Some(document) = config::load_optional(&path)? else {
        if !ctx.quiet {
            ui::info("No configuration has been applied yet");
        }
        return Ok(());
    };

    if !ctx.quiet {
        ui::dim(&format!("# {}", path.display()));
    }
    print!("{}", ConfigFormat::Yaml.render(&document)?);
    Ok(())
}
