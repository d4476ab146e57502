//! XDG locations for settings and the download cache.

use std::env;
use std::path::{Path, PathBuf};

/// Application directory name under the XDG bases.
const APP_DIR: &str = "debroot";

/// Resolve an XDG base directory from environment or default to `$HOME` + segments.
///
/// Inputs:
/// - `var`: Environment variable to check (e.g., `XDG_CONFIG_HOME`).
/// - `home_default`: Fallback path segments relative to `$HOME` if `var` is unset/empty.
///
/// Output: Resolved base directory path.
fn xdg_base_dir(var: &str, home_default: &[&str]) -> PathBuf {
    resolve_base(
        env::var(var).ok().as_deref(),
        env::var("HOME").ok().as_deref(),
        home_default,
    )
}

fn resolve_base(xdg: Option<&str>, home: Option<&str>, home_default: &[&str]) -> PathBuf {
    if let Some(p) = xdg
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    let mut base = PathBuf::from(home.unwrap_or("."));
    for seg in home_default {
        base = base.join(seg);
    }
    base
}

/// Configuration directory: `$XDG_CONFIG_HOME/debroot` or `$HOME/.config/debroot`.
#[must_use]
pub fn config_dir() -> PathBuf {
    xdg_base_dir("XDG_CONFIG_HOME", &[".config"]).join(APP_DIR)
}

/// Settings file location inside [`config_dir`].
#[must_use]
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.conf")
}

/// Default download cache: `$XDG_CACHE_HOME/debroot` or `$HOME/.cache/debroot`.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    xdg_base_dir("XDG_CACHE_HOME", &[".cache"]).join(APP_DIR)
}

/// What: Make `p` absolute against the current directory without touching the filesystem.
///
/// Inputs:
/// - `p`: Absolute or relative path.
///
/// Output:
/// - `p` unchanged when absolute, otherwise joined onto the current directory
///   (or returned as-is if the current directory is unavailable).
#[must_use]
pub fn absolutize(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    env::current_dir().map_or_else(|_| p.to_path_buf(), |cwd| cwd.join(p))
}
