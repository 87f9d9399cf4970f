//! Configuration file lookup.
//!
//! A relative `--config` path is looked up in two places, first match wins:
//!
//! 1. the current working directory (typical when running from a checkout)
//! 2. the platform config directory, e.g. `~/.config/synth-host` on Linux or
//!    `%APPDATA%\synth-host` on Windows
//!
//! Absolute paths are used as given.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name under the platform config directory
const APP_DIR: &str = "synth-host";

/// Directory holding the installed configuration, if the platform has one
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Resolve the configuration file to load.
///
/// When no candidate exists the working-directory path is returned, so the
/// load error names the file the user most likely meant.
pub fn resolve_config(requested: &Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_in(requested, &cwd, config_dir().as_deref())
}

fn resolve_in(requested: &Path, cwd: &Path, config_dir: Option<&Path>) -> PathBuf {
    if requested.is_absolute() {
        return requested.to_path_buf();
    }

    let local = cwd.join(requested);
    if local.exists() {
        debug!("Config found in working directory: {}", local.display());
        return local;
    }

    if let Some(installed) = config_dir.map(|dir| dir.join(requested)) {
        if installed.exists() {
            debug!("Config found in config directory: {}", installed.display());
            return installed;
        }
    }

    local
}
