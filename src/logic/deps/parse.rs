//! Parsing utilities for `Depends`-style relationship fields.

use super::version::{VersionConstraint, VersionOp};
use crate::error::{Error, Result};

/// What: One dependency edge parsed from a relationship field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Package id the edge points at (multiarch qualifier removed).
    pub name: String,
    /// Version restriction; parsed but never evaluated.
    pub constraint: VersionConstraint,
    /// Architecture restriction from `[...]`, if any.
    pub arch: Option<String>,
}

/// What: Parse a `Depends` field into its ordered list of dependency edges.
///
/// Inputs:
/// - `field`: Raw field value, e.g. `"libc6 (>= 2.17), perl | awk"`.
///
/// Output:
/// - Ordered edges, one per comma-separated item; `Err(InvalidDependencyItem)` on
///   the first item that does not match the grammar.
///
/// Details:
/// - Items with `|` alternatives keep only their first alternative and log a warning,
///   so `"a | b, c"` yields `[a, c]`. The other alternatives are never explored.
/// - A blank field has no dependencies.
pub fn parse_depends(field: &str) -> Result<Vec<Dependency>> {
    if field.trim().is_empty() {
        return Ok(Vec::new());
    }
    field
        .split(',')
        .map(|item| {
            let mut alternatives = item.split('|');
            let first = alternatives.next().unwrap_or_default();
            let rest = alternatives.count();
            if rest > 0 {
                tracing::warn!(
                    item = %item.trim(),
                    alternatives = rest + 1,
                    "dependency has alternatives; using the first only"
                );
            }
            parse_item(first).ok_or_else(|| Error::InvalidDependencyItem {
                item: item.trim().to_string(),
            })
        })
        .collect()
}

/// What: Match one item against `id [ "[" arch "]" ] [ "(" op version ")" ]`.
///
/// Inputs:
/// - `item`: A single alternative, surrounding whitespace allowed.
///
/// Output:
/// - `Some(Dependency)` when the whole item matches, `None` otherwise.
///
/// Details:
/// - The id ends at whitespace, `[` or `(`; a `:arch` multiarch suffix is dropped.
/// - The relation must be one of `<<`, `<=`, `=`, `>=`, `>>` and the version non-empty.
fn parse_item(item: &str) -> Option<Dependency> {
    let item = item.trim();
    let id_end = item
        .find(|c: char| c.is_whitespace() || c == '[' || c == '(')
        .unwrap_or(item.len());
    let raw_id = &item[..id_end];
    let name = raw_id.split_once(':').map_or(raw_id, |(n, _)| n);
    if name.is_empty() {
        return None;
    }
    let mut rest = item[id_end..].trim_start();

    let mut arch = None;
    if let Some(after) = rest.strip_prefix('[') {
        let close = after.find(']')?;
        let inner = after[..close].trim();
        if inner.is_empty() {
            return None;
        }
        arch = Some(inner.to_string());
        rest = after[close + 1..].trim_start();
    }

    let mut constraint = VersionConstraint::any();
    if let Some(after) = rest.strip_prefix('(') {
        let close = after.find(')')?;
        let inner = after[..close].trim();
        let op_end = inner
            .find(|c: char| !matches!(c, '<' | '>' | '='))
            .unwrap_or(inner.len());
        let op = VersionOp::parse(&inner[..op_end])?;
        let version = inner[op_end..].trim();
        if version.is_empty() || version.contains(char::is_whitespace) {
            return None;
        }
        constraint = VersionConstraint::new(op, version);
        rest = after[close + 1..].trim_start();
    }

    if !rest.is_empty() {
        return None;
    }
    Some(Dependency {
        name: name.to_string(),
        constraint,
        arch,
    })
}
