//! Turning package ids into unpacked directory trees in the local cache.
//!
//! Archives land in `{cache}/debs/{file name}` and are unpacked into
//! `{cache}/debs-unpacked/{id}`. Both are reused across runs; a freshly
//! downloaded archive invalidates any previously unpacked tree for that id.

use crate::error::{Error, Result};
use crate::index::{PackageIndex, PackageRecord};
use crate::util::{http_client, paths::absolutize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Unpacker used for `.deb` archives.
pub const DPKG_DEB: &str = "dpkg-deb";

/// What: Produces an unpacked directory tree for one package.
pub trait Materializer {
    /// Return the absolute directory holding `record`'s unpacked contents.
    fn materialize(&self, record: &PackageRecord) -> Result<PathBuf>;
}

/// What: Downloads `.deb` archives over HTTP and unpacks them with `dpkg-deb`.
pub struct DebMaterializer {
    debs_dir: PathBuf,
    unpacked_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl DebMaterializer {
    /// Materializer rooted at `cache_dir`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            debs_dir: cache_dir.join("debs"),
            unpacked_dir: cache_dir.join("debs-unpacked"),
            client: http_client(),
        }
    }

    /// Where the archive for `record` is cached.
    #[must_use]
    pub fn archive_path(&self, record: &PackageRecord) -> PathBuf {
        let url = record.archive_url();
        let name = url.rsplit('/').next().unwrap_or(record.id());
        self.debs_dir.join(name)
    }

    /// Where `record` is unpacked.
    #[must_use]
    pub fn unpacked_path(&self, record: &PackageRecord) -> PathBuf {
        self.unpacked_dir.join(record.id())
    }

    fn failure(record: &PackageRecord, reason: impl Into<String>) -> Error {
        Error::Materialize {
            package: record.id().to_string(),
            reason: reason.into(),
        }
    }

    /// Download into a `.part` file and rename into place once complete.
    fn download(&self, record: &PackageRecord, dest: &Path) -> Result<()> {
        let url = record.archive_url();
        tracing::info!(url = %url, dest = %dest.display(), "downloading package archive");
        let partial = dest.with_extension("deb.part");
        let result = (|| -> std::result::Result<(), String> {
            let mut response = self
                .client
                .get(&url)
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .map_err(|e| e.to_string())?;
            let mut file = fs::File::create(&partial).map_err(|e| e.to_string())?;
            response.copy_to(&mut file).map_err(|e| e.to_string())?;
            fs::rename(&partial, dest).map_err(|e| e.to_string())
        })();
        if let Err(reason) = result {
            let _ = fs::remove_file(&partial);
            return Err(Self::failure(record, format!("download of {url} failed: {reason}")));
        }
        Ok(())
    }

    fn unpack(record: &PackageRecord, archive: &Path, dest: &Path) -> Result<()> {
        let dpkg_deb = which::which(DPKG_DEB).map_err(|_| Error::MissingProgram(DPKG_DEB))?;
        tracing::info!(archive = %archive.display(), dest = %dest.display(), "unpacking package archive");
        fs::create_dir_all(dest)?;
        let outcome = Command::new(dpkg_deb).arg("-x").arg(archive).arg(dest).output();
        let reason = match outcome {
            Ok(out) if out.status.success() => return Ok(()),
            Ok(out) => format!(
                "{DPKG_DEB} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            ),
            Err(e) => format!("cannot run {DPKG_DEB}: {e}"),
        };
        if let Err(e) = fs::remove_dir_all(dest) {
            tracing::warn!(path = %dest.display(), error = %e, "failed to remove partial unpack");
        }
        Err(Self::failure(record, reason))
    }
}

impl Materializer for DebMaterializer {
    fn materialize(&self, record: &PackageRecord) -> Result<PathBuf> {
        let archive = self.archive_path(record);
        let unpacked = self.unpacked_path(record);
        fs::create_dir_all(&self.debs_dir)?;
        fs::create_dir_all(&self.unpacked_dir)?;

        if archive.is_file() {
            tracing::debug!(archive = %archive.display(), "using cached archive");
        } else {
            self.download(record, &archive)?;
            if unpacked.exists() {
                tracing::debug!(path = %unpacked.display(), "removing stale unpacked tree");
                fs::remove_dir_all(&unpacked)?;
            }
        }

        if unpacked.is_dir() {
            tracing::debug!(path = %unpacked.display(), "using cached unpacked tree");
        } else {
            Self::unpack(record, &archive, &unpacked)?;
        }
        Ok(absolutize(&unpacked))
    }
}

/// What: Materialize every known id of a closure.
///
/// Inputs:
/// - `ids`: Closure in overlay priority order.
/// - `index`: Records for the ids.
/// - `materializer`: Produces the unpacked trees.
///
/// Output:
/// - Unpacked directories in the order of `ids`.
///
/// Details:
/// - Ids missing from the index are logged and skipped; any materializer
///   failure is fatal.
pub fn materialize_all<'a, I>(
    ids: I,
    index: &PackageIndex,
    materializer: &dyn Materializer,
) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut roots = Vec::new();
    for id in ids {
        let Some(record) = index.get(id) else {
            tracing::warn!(package = %id, "skipping unknown package");
            continue;
        };
        tracing::info!(package = %id, version = %record.version(), "processing");
        roots.push(materializer.materialize(record)?);
    }
    Ok(roots)
}
