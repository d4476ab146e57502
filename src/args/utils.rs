//! Shared utilities for argument processing.

use std::path::{Path, PathBuf};

/// What: Determine the log level based on command-line arguments.
///
/// Inputs:
/// - `args`: Parsed command-line arguments.
///
/// Output:
/// - Log level string (trace, debug, info, warn, error).
///
/// Details:
/// - Verbose flag overrides `log_level` argument.
pub fn determine_log_level(args: &crate::args::Args) -> String {
    if args.verbose {
        "debug".to_string()
    } else {
        args.log_level.clone()
    }
}

/// What: Block until the operator presses return.
///
/// Inputs:
/// - `message`: Shown before waiting.
///
/// Details:
/// - Read errors (e.g. closed stdin) end the wait immediately.
pub fn pause(message: &str) {
    use std::io::{self, Write};

    println!("{message}");
    io::stdout().flush().ok();
    let mut input = String::new();
    if let Err(e) = io::stdin().read_line(&mut input) {
        tracing::debug!(error = %e, "pause: stdin unavailable");
    }
}

/// What: Pick a fresh sandbox destination path that does not exist yet.
///
/// Inputs:
/// - `parent`: Directory to create the destination in.
/// - `package`: Root package id, used in the name.
///
/// Output:
/// - `{parent}/debroot-{package}-{timestamp}-{pid}`.
///
/// Details:
/// - Nothing is created here; the sandbox creates it through its gateway.
pub fn fresh_destination(parent: &Path, package: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let safe: String = package
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "+-.".contains(c) { c } else { '_' })
        .collect();
    parent.join(format!("debroot-{safe}-{stamp}-{}", std::process::id()))
}
