//! Settings file parsing.
//!
//! `settings.conf` is a plain `key = value` file; blank lines and lines starting
//! with `#`, `//` or `;` are ignored. List values are comma separated.

use std::path::{Path, PathBuf};

/// What: Check if a line should be skipped (empty or comment).
///
/// Inputs:
/// - `line`: Line to check
///
/// Output:
/// - `true` if the line should be skipped, `false` otherwise
///
/// Details:
/// - Skips empty lines and lines starting with `#`, `//`, or `;`
#[must_use]
pub fn skip_comment_or_empty(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
        || trimmed.starts_with(';')
}

/// What: Parse a key-value pair from a line.
///
/// Inputs:
/// - `line`: Line containing key=value format
///
/// Output:
/// - `Some((key, value))` if parsing succeeds, `None` otherwise
///
/// Details:
/// - Splits on the first `=` character
/// - Trims whitespace from both key and value
#[must_use]
pub fn parse_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.trim().split_once('=')?;
    Some((key.trim().to_string(), value.trim().to_string()))
}

/// Split a comma separated list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// What: User settings that provide defaults for every run.
///
/// Details:
/// - `None` list values mean "not configured"; the job file or built-in defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Download and unpack cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Parent directory for freshly created sandbox destinations.
    pub dest_parent: Option<PathBuf>,
    /// Package ids cut from every closure.
    pub exclude: Option<Vec<String>>,
    /// Paths always taken from the real root.
    pub sacred: Option<Vec<String>>,
    /// Prefixes where existing real-root files win.
    pub prefer_existing: Option<Vec<String>>,
    /// Ask before every filesystem mutation.
    pub confirm: bool,
}

impl Settings {
    /// What: Parse settings from file contents.
    ///
    /// Inputs:
    /// - `text`: Contents of `settings.conf`.
    ///
    /// Output:
    /// - Parsed settings; unknown keys and bad values are logged and ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut settings = Self::default();
        for line in text.lines() {
            if skip_comment_or_empty(line) {
                continue;
            }
            let Some((key, value)) = parse_key_value(line) else {
                tracing::warn!(line = %line.trim(), "ignoring settings line without '='");
                continue;
            };
            match key.as_str() {
                "cache_dir" => settings.cache_dir = Some(PathBuf::from(value)),
                "dest_parent" => settings.dest_parent = Some(PathBuf::from(value)),
                "exclude" => settings.exclude = Some(parse_list(&value)),
                "sacred" | "never_overlay" => settings.sacred = Some(parse_list(&value)),
                "prefer_existing" => settings.prefer_existing = Some(parse_list(&value)),
                "confirm" => match parse_bool(&value) {
                    Some(b) => settings.confirm = b,
                    None => tracing::warn!(value = %value, "invalid boolean for confirm"),
                },
                other => tracing::warn!(key = %other, "unknown settings key"),
            }
        }
        settings
    }

    /// What: Load settings from `path`, defaulting when the file is absent or unreadable.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), "loaded settings");
                Self::parse(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read settings");
                Self::default()
            }
        }
    }

    /// Load settings from the default location.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(&super::paths::settings_path())
    }
}
