//! Host mount table capture.

use std::path::{Path, PathBuf};

/// Mountpoints (relative to `/`) that never take part in a sandbox, with everything below them.
pub const SYSTEM_MOUNTPOINTS: &[&str] = &["proc", "sys", "var"];

/// Field index for mount point in /proc/self/mountinfo.
/// Format: ID PARENT_ID MAJOR:MINOR ROOT MOUNT_POINT OPTIONS ...
const MOUNTINFO_MOUNT_POINT_FIELD: usize = 4;

/// Field index for mount point in /proc/mounts (fstab layout).
const MOUNTS_MOUNT_POINT_FIELD: usize = 1;

/// What: Read the host mount table and drop protected system mountpoints.
///
/// Output:
/// - Relative mountpoints, shortest first; `Err` when neither
///   `/proc/self/mountinfo` nor `/proc/mounts` can be read.
///
/// Details:
/// - The root mount itself becomes the empty path and is kept.
pub fn capture_mounts() -> std::io::Result<Vec<PathBuf>> {
    let mounts = match std::fs::read_to_string("/proc/self/mountinfo") {
        Ok(text) => parse_mount_table(&text, MOUNTINFO_MOUNT_POINT_FIELD),
        Err(e) => {
            tracing::debug!(error = %e, "mountinfo unavailable; falling back to /proc/mounts");
            parse_mount_table(
                &std::fs::read_to_string("/proc/mounts")?,
                MOUNTS_MOUNT_POINT_FIELD,
            )
        }
    };
    Ok(filter_protected(mounts))
}

/// Extract the mount point column from a whitespace separated mount table.
fn parse_mount_table(text: &str, field: usize) -> Vec<PathBuf> {
    text.lines()
        .filter_map(|line| line.split_whitespace().nth(field))
        .map(|m| PathBuf::from(unescape_mount_path(m)))
        .collect()
}

/// What: Drop system mountpoints and anything nested beneath them.
///
/// Inputs:
/// - `mounts`: Absolute mountpoints in any order, duplicates allowed.
///
/// Output:
/// - Remaining mountpoints relative to `/`, deduplicated, shortest first.
pub fn filter_protected(mounts: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut kept: Vec<PathBuf> = Vec::new();
    for mount in mounts {
        let rel = crate::overlay::relative_of(&mount);
        if is_protected(&rel) {
            tracing::info!(mount = %mount.display(), "skipping system mountpoint");
            continue;
        }
        if !kept.contains(&rel) {
            kept.push(rel);
        }
    }
    kept.sort_by_key(|p| p.as_os_str().len());
    kept
}

fn is_protected(rel: &Path) -> bool {
    SYSTEM_MOUNTPOINTS.iter().any(|sys| rel.starts_with(sys))
}

/// Unescape mount point from mountinfo format.
/// Spaces are encoded as \040, tabs as \011, etc.
fn unescape_mount_path(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..=i + 3].iter().all(|b| (b'0'..=b'7').contains(b))
            && let Ok(code) = u8::from_str_radix(&s[i + 1..=i + 3], 8)
        {
            out.push(code);
            i += 4;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
