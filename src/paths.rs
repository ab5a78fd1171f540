//! Centralized path resolution for sysconf
//!
//! # Environment Variables
//!
//! - `SYSCONF_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/sysconf`)
//! - `SYSCONF_HISTORY_DIR` - Override history directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `SYSCONF_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/system-config-manager` (if set)
//! 3. `~/.config/system-config-manager`
//!
//! For history_dir():
//! 1. `SYSCONF_HISTORY_DIR` environment variable
//! 2. `<config dir>/.history`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "SYSCONF_CONFIG_DIR";

/// Environment variable for history directory override
pub const ENV_HISTORY_DIR: &str = "SYSCONF_HISTORY_DIR";

/// Directory name under the XDG/home config root
const APP_DIR: &str = "system-config-manager";

/// Config file names tried, in order, when no path is given
pub const CONFIG_FILE_NAMES: &[&str] = &["config.yaml", "config.yml", "config.toml", "config.json"];

/// Get the sysconf config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_with(|key| std::env::var(key).ok())
}

/// Get the directory holding the applied-config history
pub fn history_dir() -> Result<PathBuf> {
    history_dir_with(|key| std::env::var(key).ok())
}

fn config_dir_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Some(dir) = env(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Some(xdg_config) = env("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Default: ~/.config/system-config-manager
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

fn history_dir_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = env(ENV_HISTORY_DIR) {
        let path = expand(&dir);
        log::debug!("Using history dir from {}: {}", ENV_HISTORY_DIR, path.display());
        return Ok(path);
    }

    Ok(config_dir_with(env)?.join(".history"))
}

/// Locate the default config file inside `dir`
///
/// Returns the first existing candidate, or `config.yaml` when none exists
/// so the caller can report a sensible path.
pub fn default_config_file(dir: &Path) -> PathBuf {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .unwrap_or_else(|| dir.join(CONFIG_FILE_NAMES[0]))
}

/// Expand `~` in a path string
pub fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_dir_env_override() {
        let result = config_dir_with(env_of(&[(ENV_CONFIG_DIR, "/custom/config/path")])).unwrap();
        assert_eq!(result, PathBuf::from("/custom/config/path"));
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let result = config_dir_with(env_of(&[(ENV_CONFIG_DIR, "~/dotfiles/sysconf")])).unwrap();
        assert_eq!(result, home.join("dotfiles").join("sysconf"));
    }

    #[test]
    fn test_xdg_config_home() {
        let result = config_dir_with(env_of(&[("XDG_CONFIG_HOME", "/tmp/xdg")])).unwrap();
        assert_eq!(result, PathBuf::from("/tmp/xdg/system-config-manager"));
    }

    #[test]
    fn test_config_dir_default() {
        let result = config_dir_with(env_of(&[])).unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join(".config").join("system-config-manager"));
    }

    #[test]
    fn test_history_dir_follows_config_dir() {
        let result = history_dir_with(env_of(&[(ENV_CONFIG_DIR, "/etc/sysconf")])).unwrap();
        assert_eq!(result, PathBuf::from("/etc/sysconf/.history"));
    }

    #[test]
    fn test_history_dir_override() {
        let result = history_dir_with(env_of(&[
            (ENV_CONFIG_DIR, "/etc/sysconf"),
            (ENV_HISTORY_DIR, "/var/lib/sysconf"),
        ]))
        .unwrap();
        assert_eq!(result, PathBuf::from("/var/lib/sysconf"));
    }

    #[test]
    fn test_default_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(default_config_file(dir.path()), dir.path().join("config.yaml"));

        std::fs::write(dir.path().join("config.toml"), "version = 1\n").unwrap();
        assert_eq!(default_config_file(dir.path()), dir.path().join("config.toml"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }
}
