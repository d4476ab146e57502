//! Small shared helpers: HTTP client construction, cache keys, paths and settings.

pub mod config;
pub mod paths;

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// What: Build the blocking HTTP client used for index and archive downloads.
///
/// Output:
/// - Client with a generous timeout; falls back to the default client if the
///   builder fails.
#[must_use]
pub fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .user_agent(concat!("debroot/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new())
}

/// What: Short stable cache key for a URL.
///
/// Inputs:
/// - `url`: Any string.
///
/// Output:
/// - First 10 lowercase hex digits of the SHA-256 digest.
#[must_use]
pub fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(10);
    for b in digest.iter().take(5) {
        let _ = write!(out, "{b:02x}");
    }
    out
}
