//! Breadth-first dependency closure over a package index.

use super::parse::parse_depends;
use crate::error::Result;
use crate::index::PackageIndex;
use std::collections::{BTreeSet, HashSet};

/// What: Compute the transitive runtime dependency set of `root`.
///
/// Inputs:
/// - `root`: Package id to start from; always part of the result.
/// - `index`: Merged package index to read `Depends` fields from.
/// - `exclude`: Ids cut from the graph; neither they nor anything reachable only
///   through them is added.
///
/// Output:
/// - Sorted set of every id reached, or `Err(InvalidDependencyItem)` when a
///   reached package carries a malformed `Depends` field.
///
/// Details:
/// - Expands an explicit frontier level by level until it is empty; the visited
///   set only grows and the index is finite, so the loop terminates.
/// - Ids missing from the index stay in the result but are not expanded.
/// - Each excluded id is logged once, however many edges reach it.
/// - Version constraints are ignored: every edge counts as satisfied.
pub fn closure(root: &str, index: &PackageIndex, exclude: &HashSet<String>) -> Result<BTreeSet<String>> {
    let _span = tracing::debug_span!("closure", root = %root).entered();
    let mut all_deps: BTreeSet<String> = BTreeSet::new();
    let mut frontier: BTreeSet<String> = BTreeSet::from([root.to_string()]);
    let mut seen_excludes: HashSet<&str> = HashSet::new();

    while !frontier.is_empty() {
        all_deps.extend(frontier.iter().cloned());
        let mut next: BTreeSet<String> = BTreeSet::new();

        for id in &frontier {
            let Some(record) = index.get(id) else {
                tracing::warn!(package = %id, "could not find package info; not expanding");
                continue;
            };
            let Some(field) = record.field("Depends") else {
                continue;
            };
            tracing::debug!(package = %id, depends = %field, "expanding");
            for dep in parse_depends(field)? {
                if let Some(excluded) = exclude.get(&dep.name) {
                    if seen_excludes.insert(excluded.as_str()) {
                        tracing::info!(package = %dep.name, "skipping excluded package");
                    }
                    continue;
                }
                if all_deps.contains(&dep.name) {
                    tracing::trace!(package = %dep.name, "skipping duplicate");
                    continue;
                }
                next.insert(dep.name);
            }
        }
        frontier = next;
    }

    tracing::debug!(count = all_deps.len(), "closure complete");
    Ok(all_deps)
}
