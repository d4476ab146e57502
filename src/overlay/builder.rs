//! Breadth-first merge of several source trees into one tree of symlinks.

use super::gateway::{Gateway, Mode};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name of the private subtree through which every source root is reachable.
pub const PRIVATE_ROOT_NAME: &str = "__root";

/// What: Normalise a path into a relative path below `/`.
///
/// Inputs:
/// - `p`: Absolute or relative path, e.g. `/etc/` or `usr/share`.
///
/// Output:
/// - Relative path with root, `.` and `..` components removed (`/etc/` → `etc`).
#[must_use]
pub fn relative_of(p: &Path) -> PathBuf {
    p.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// What: Everything the builder needs to know about the sources and policies.
#[derive(Debug, Clone)]
pub struct OverlayLayout {
    overlay_roots: Vec<PathBuf>,
    real_root: PathBuf,
    sacred: Vec<PathBuf>,
    prefer_existing: Vec<PathBuf>,
    private_root_name: String,
    fail_on_listing_error: bool,
}

impl OverlayLayout {
    /// What: Layout over `overlay_roots` (earliest wins) on top of `/`.
    ///
    /// Details:
    /// - No sacred paths or prefer-existing prefixes until configured.
    pub fn new<I, P>(overlay_roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            overlay_roots: overlay_roots.into_iter().map(Into::into).collect(),
            real_root: PathBuf::from("/"),
            sacred: Vec::new(),
            prefer_existing: Vec::new(),
            private_root_name: PRIVATE_ROOT_NAME.to_string(),
            fail_on_listing_error: false,
        }
    }

    /// Use `root` as the lowest-priority source instead of `/`.
    #[must_use]
    pub fn with_real_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.real_root = root.into();
        self
    }

    /// Paths that always resolve from the real root.
    #[must_use]
    pub fn with_sacred<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.sacred = paths.into_iter().map(|p| relative_of(p.as_ref())).collect();
        self
    }

    /// Prefixes under which an existing real-root regular file wins.
    #[must_use]
    pub fn with_prefer_existing<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.prefer_existing = paths.into_iter().map(|p| relative_of(p.as_ref())).collect();
        self
    }

    /// Turn directory listing failures into a fatal `ListingFailure`.
    #[must_use]
    pub const fn with_strict_listing(mut self, strict: bool) -> Self {
        self.fail_on_listing_error = strict;
        self
    }

    /// Overlay roots in priority order.
    #[must_use]
    pub fn overlay_roots(&self) -> &[PathBuf] {
        &self.overlay_roots
    }

    /// Lowest-priority source.
    #[must_use]
    pub fn real_root(&self) -> &Path {
        &self.real_root
    }

    /// Name of the private subtree.
    #[must_use]
    pub fn private_root_name(&self) -> &str {
        &self.private_root_name
    }

    /// What: Symlink target for `rel` taken from `source`.
    ///
    /// Output:
    /// - `/{private}/{source without leading '/'}/{rel}`; the real root `/`
    ///   contributes no component.
    #[must_use]
    pub fn link_target(&self, source: &Path, rel: &Path) -> PathBuf {
        Path::new("/")
            .join(&self.private_root_name)
            .join(relative_of(source))
            .join(rel)
    }

    fn is_sacred(&self, rel: &Path) -> bool {
        self.sacred.iter().any(|s| s == rel)
    }

    fn prefers_existing(&self, rel: &Path) -> bool {
        self.prefer_existing.iter().any(|p| rel.starts_with(p))
    }

    /// All sources, overlay roots first and the real root last.
    fn sources(&self) -> Vec<&Path> {
        self.overlay_roots
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(self.real_root.as_path()))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        let real = fs::canonicalize(&self.real_root).map_err(|_| Error::InvalidOverlayRoot {
            path: self.real_root.clone(),
            reason: "real root does not exist",
        })?;
        if !real.is_dir() {
            return Err(Error::InvalidOverlayRoot {
                path: self.real_root.clone(),
                reason: "real root is not a directory",
            });
        }
        for root in &self.overlay_roots {
            let invalid = |reason| Error::InvalidOverlayRoot {
                path: root.clone(),
                reason,
            };
            if !root.is_absolute() {
                return Err(invalid("overlay root must be absolute"));
            }
            if !root.is_dir() {
                return Err(invalid("overlay root is not a directory"));
            }
            if fs::canonicalize(root).is_ok_and(|c| c == real) {
                return Err(invalid("overlay root is the real root"));
            }
        }
        Ok(())
    }
}

/// What: Counters describing one build, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Breadth-first levels processed.
    pub levels: usize,
    /// Symlinks created.
    pub placed: usize,
    /// Symlinks requested but not performed (dry-run or operator refusal).
    pub not_performed: usize,
    /// Paths merged as directories from two or more sources.
    pub merged_dirs: usize,
    /// Destination paths that already existed and were left alone.
    pub skipped_existing: usize,
    /// Source directories that could not be listed.
    pub listing_failures: usize,
    /// Non-directory entries dropped where a directory merge was required.
    pub unmergeable: usize,
}

/// How a source's entry at some relative path takes part in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    Other,
}

/// What: Merges the layout's sources into `destination` through a gateway.
pub struct OverlayBuilder<'a> {
    layout: &'a OverlayLayout,
    destination: &'a Path,
    gateway: &'a mut Gateway,
    sources: Vec<&'a Path>,
    report: BuildReport,
}

impl<'a> OverlayBuilder<'a> {
    /// Prepare a build of `layout` into the existing directory `destination`.
    pub fn new(layout: &'a OverlayLayout, destination: &'a Path, gateway: &'a mut Gateway) -> Self {
        Self {
            layout,
            destination,
            gateway,
            sources: layout.sources(),
            report: BuildReport::default(),
        }
    }

    /// What: Run the layered merge.
    ///
    /// Output:
    /// - Report of what was done, or the first fatal error (invalid roots, strict
    ///   listing failure, gateway I/O error or operator abort).
    ///
    /// Details:
    /// - Each level lists the children of every frontier entry, groups them by
    ///   relative path in source priority order and resolves each path as
    ///   sacred, singular, prefer-existing, file-wins or directory-merge.
    /// - Only merged directories are descended into, so every level is strictly
    ///   deeper than the previous one.
    pub fn build(mut self) -> Result<BuildReport> {
        self.layout.validate()?;
        let _span = tracing::info_span!(
            "overlay",
            destination = %self.destination.display(),
            sources = self.sources.len()
        )
        .entered();

        let mut frontier: Vec<(usize, PathBuf)> =
            (0..self.sources.len()).map(|i| (i, PathBuf::new())).collect();

        while !frontier.is_empty() {
            self.report.levels += 1;
            tracing::debug!(level = self.report.levels, entries = frontier.len(), "merging level");
            let candidates = self.collect_children(&frontier)?;
            let mut next = Vec::new();
            for (rel, srcs) in candidates {
                self.resolve(&rel, &srcs, &mut next)?;
            }
            frontier = next;
        }

        tracing::info!(
            placed = self.report.placed,
            merged = self.report.merged_dirs,
            levels = self.report.levels,
            "overlay complete"
        );
        Ok(self.report)
    }

    /// List every frontier entry and group child paths by the sources holding them.
    fn collect_children(
        &mut self,
        frontier: &[(usize, PathBuf)],
    ) -> Result<BTreeMap<PathBuf, Vec<usize>>> {
        let mut candidates: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        for (src, rel) in frontier {
            let dir = self.sources[*src].join(rel);
            let names = match list_dir(&dir) {
                Ok(names) => names,
                Err(e) if self.layout.fail_on_listing_error => {
                    return Err(Error::ListingFailure { path: dir, source: e });
                }
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "cannot list directory; skipping source for this level");
                    self.report.listing_failures += 1;
                    continue;
                }
            };
            for name in names {
                let holders = candidates.entry(rel.join(name)).or_default();
                if !holders.contains(src) {
                    holders.push(*src);
                }
            }
        }
        for holders in candidates.values_mut() {
            holders.sort_unstable();
        }
        Ok(candidates)
    }

    fn resolve(&mut self, rel: &Path, srcs: &[usize], next: &mut Vec<(usize, PathBuf)>) -> Result<()> {
        let real = self.sources.len() - 1;
        let top = srcs[0];

        if self.layout.is_sacred(rel) {
            tracing::debug!(path = %rel.display(), "sacred; using real root");
            return self.place(real, rel);
        }
        if srcs.len() == 1 {
            tracing::trace!(path = %rel.display(), source = %self.sources[top].display(), "singular");
            return self.place(top, rel);
        }
        if self.layout.prefers_existing(rel) && self.layout.real_root.join(rel).is_file() {
            tracing::debug!(path = %rel.display(), "preferring existing real-root file");
            return self.place(real, rel);
        }
        if self.kind(top, rel) == EntryKind::Other {
            tracing::trace!(path = %rel.display(), source = %self.sources[top].display(), "file wins");
            return self.place(top, rel);
        }

        self.report.merged_dirs += 1;
        for &src in srcs {
            if self.kind(src, rel) == EntryKind::Dir {
                tracing::trace!(path = %rel.display(), source = %self.sources[src].display(), "queueing");
                next.push((src, rel.to_path_buf()));
            } else {
                tracing::warn!(
                    path = %rel.display(),
                    source = %self.sources[src].display(),
                    "skipping non-directory where a directory merge is required"
                );
                self.report.unmergeable += 1;
            }
        }
        let dir = self.destination.join(rel);
        if fs::symlink_metadata(&dir).is_err() {
            self.gateway.create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// What: Classify a source's entry for merging.
    ///
    /// Details:
    /// - Symlinks are followed, so a link to a directory merges like a directory.
    /// - A directory symlink resolving to one of its own ancestors (e.g.
    ///   `usr/bin/X11 -> .`) counts as `Other`, which keeps the descent finite.
    fn kind(&self, src: usize, rel: &Path) -> EntryKind {
        let full = self.sources[src].join(rel);
        if !full.is_dir() {
            return EntryKind::Other;
        }
        let is_link = fs::symlink_metadata(&full).is_ok_and(|m| m.file_type().is_symlink());
        if is_link
            && let (Ok(target), Some(Ok(parent))) =
                (fs::canonicalize(&full), full.parent().map(fs::canonicalize))
            && parent.starts_with(&target)
        {
            tracing::debug!(path = %full.display(), "directory link loops to an ancestor; not descending");
            return EntryKind::Other;
        }
        EntryKind::Dir
    }

    /// What: Link `rel` in the destination to `source`'s copy.
    ///
    /// Details:
    /// - Creates missing parent directories; leaves an existing destination entry alone.
    /// - When the operator refuses the parent directory, the link is skipped too.
    fn place(&mut self, src: usize, rel: &Path) -> Result<()> {
        let link = self.destination.join(rel);
        if let Some(parent) = link.parent()
            && fs::symlink_metadata(parent).is_err()
            && !self.gateway.create_dir_all(parent)?
            && self.gateway.mode() == Mode::Confirm
        {
            tracing::info!(path = %link.display(), "parent directory refused; skipping link");
            self.report.not_performed += 1;
            return Ok(());
        }
        if fs::symlink_metadata(&link).is_ok() {
            tracing::debug!(path = %link.display(), "already exists; skipping");
            self.report.skipped_existing += 1;
            return Ok(());
        }
        let target = self.layout.link_target(self.sources[src], rel);
        if self.gateway.symlink(&target, &link)? {
            self.report.placed += 1;
        } else {
            self.report.not_performed += 1;
        }
        Ok(())
    }
}

/// Sorted child names of `dir`.
fn list_dir(dir: &Path) -> std::io::Result<Vec<std::ffi::OsString>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// What: Build `layout` into `destination` through `gateway`.
///
/// Details:
/// - Convenience wrapper around [`OverlayBuilder`].
pub fn build_overlay(
    layout: &OverlayLayout,
    destination: &Path,
    gateway: &mut Gateway,
) -> Result<BuildReport> {
    OverlayBuilder::new(layout, destination, gateway).build()
}
