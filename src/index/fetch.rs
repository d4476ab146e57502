//! Fetching and caching of compressed package indexes.

use crate::error::{Error, Result};
use crate::util::{cache_key, http_client};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};

/// What: Source of decompressed package index text for a given index URL.
///
/// Details:
/// - The production implementation downloads over HTTP and caches on disk; tests
///   substitute an in-memory map.
pub trait IndexFetcher {
    /// Return the decompressed index behind `url`, or `RepositoryUnreachable`.
    fn fetch(&self, url: &str) -> Result<String>;
}

/// What: HTTP index fetcher with a persistent decompressed cache.
pub struct HttpIndexFetcher {
    cache_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl HttpIndexFetcher {
    /// Create a fetcher caching under `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            client: http_client(),
        }
    }

    /// What: Location of the cached decompressed index for `url`.
    ///
    /// Output:
    /// - `{cache_dir}/Packages-{first 10 hex digits of sha256(url)}`.
    #[must_use]
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("Packages-{}", cache_key(url)))
    }

    fn download(&self, url: &str, dest: &Path) -> std::result::Result<(), String> {
        tracing::info!(url = %url, "downloading package index");
        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| e.to_string())?;
        let body = response.bytes().map_err(|e| e.to_string())?;
        let mut text = String::new();
        if Path::new(url).extension().is_some_and(|ext| ext == "gz") {
            GzDecoder::new(body.as_ref())
                .read_to_string(&mut text)
                .map_err(|e| format!("decompress failed: {e}"))?;
        } else {
            text = String::from_utf8_lossy(&body).into_owned();
        }
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| e.to_string())?;
        std::fs::write(dest, text).map_err(|e| e.to_string())
    }
}

impl IndexFetcher for HttpIndexFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let path = self.cache_path(url);
        if path.is_file() {
            tracing::info!(path = %path.display(), "using cached package index");
        } else if let Err(reason) = self.download(url, &path) {
            if path.exists()
                && let Err(e) = std::fs::remove_file(&path)
            {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove partial index");
            }
            return Err(Error::RepositoryUnreachable {
                url: url.to_string(),
                reason,
            });
        }
        std::fs::read_to_string(&path).map_err(|e| Error::RepositoryUnreachable {
            url: url.to_string(),
            reason: format!("cannot read cache {}: {e}", path.display()),
        })
    }
}
