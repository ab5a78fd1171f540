// Cycle commands
pub mod apply;
pub mod preview;

// Inspection commands
pub mod domains;
pub mod history;
pub mod show;

use anyhow::{Context as AnyhowContext, Result};
use std::path::{Path, PathBuf};

use crate::history::FileHistory;
use crate::paths;

/// Config file named on the command line, or the default one
pub(crate) fn resolve_config(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(paths::expand(&path.to_string_lossy())),
        None => Ok(paths::default_config_file(&paths::config_dir()?)),
    }
}

/// History store for the default history directory
pub(crate) fn open_history(last_config: Option<&Path>) -> Result<FileHistory> {
    let dir = paths::history_dir().context("Could not determine history directory")?;
    let previous = last_config.map(|p| paths::expand(&p.to_string_lossy()));
    Ok(FileHistory::new(dir).with_previous(previous))
}
