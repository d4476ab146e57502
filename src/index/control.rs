//! Parser for Debian control-style package index stanzas.

use std::collections::HashMap;

/// What: Split a `Packages` index into `(package id, fields)` stanzas.
///
/// Inputs:
/// - `text`: Decompressed index contents.
///
/// Output:
/// - One entry per stanza in file order; the `Package` field becomes the id and is
///   removed from the field map.
///
/// Details:
/// - Stanzas are separated by blank lines; fields are `Key: value`.
/// - Lines starting with whitespace continue the previous field (joined with `\n`).
/// - Stanzas without `Package` or `Version` are skipped with a warning.
pub fn parse_packages(text: &str) -> Vec<(String, HashMap<String, String>)> {
    let mut out = Vec::new();
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut last_key: Option<String> = None;

    for line in text.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !fields.is_empty() {
                finish_stanza(std::mem::take(&mut fields), &mut out);
            }
            last_key = None;
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some(k) = &last_key
                && let Some(v) = fields.get_mut(k)
            {
                v.push('\n');
                v.push_str(line.trim());
            }
            continue;
        }
        if let Some((k, v)) = line.split_once(':') {
            let key = k.trim().to_string();
            fields.insert(key.clone(), v.trim().to_string());
            last_key = Some(key);
        } else {
            tracing::debug!(line = %line, "ignoring malformed index line");
        }
    }
    out
}

fn finish_stanza(
    mut fields: HashMap<String, String>,
    out: &mut Vec<(String, HashMap<String, String>)>,
) {
    let Some(id) = fields.remove("Package") else {
        tracing::warn!("index stanza without Package field; skipping");
        return;
    };
    if !fields.contains_key("Version") {
        tracing::warn!(package = %id, "index stanza without Version field; skipping");
        return;
    }
    out.push((id, fields));
}
