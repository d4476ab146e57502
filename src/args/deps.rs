//! Command-line dependency listing (`--print-deps`).

use debroot::index::PackageIndex;
use debroot::logic::deps::closure;
use std::collections::{BTreeSet, HashSet};

/// What: Render a closure for the terminal or as JSON.
///
/// Inputs:
/// - `deps`: Closure ids in sorted order.
/// - `json`: Emit a JSON array instead of a bullet list.
///
/// Output:
/// - Text to print, without a trailing newline.
pub fn render_deps(deps: &BTreeSet<String>, json: bool) -> String {
    if json {
        serde_json::to_string_pretty(deps).unwrap_or_else(|_| "[]".to_string())
    } else {
        deps.iter()
            .map(|d| format!(" - {d}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// What: Handle `--print-deps` by printing the full closure of `package`.
///
/// Output:
/// - Exit code 0, or the resolver error.
///
/// Details:
/// - Nothing is excluded so the listing shows every reachable id.
pub fn handle_print_deps(package: &str, index: &PackageIndex, json: bool) -> debroot::Result<i32> {
    tracing::info!(package = %package, "listing dependency closure");
    let deps = closure(package, index, &HashSet::new())?;
    println!("{}", render_deps(&deps, json));
    Ok(0)
}
