//! Integration tests from repository indexes to unpacked package roots.
//!
//! Tests cover:
//! - Index assembly from a warm on-disk cache (no network)
//! - First repository winning for duplicate ids
//! - Closure with exclusions and alternatives
//! - Materialization order and unknown-id tolerance

#![cfg(test)]

use debroot::index::{HttpIndexFetcher, IndexFetcher, PackageIndex, RepositorySource};
use debroot::logic::deps::closure;
use debroot::materialize::{Materializer, materialize_all};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

const MAIN_INDEX: &str = "\
Package: hello
Version: 2.10-3
Architecture: amd64
Depends: libfoo1 (>= 1.0), libc6 (>= 2.34)
Description: example package
 printing a greeting.

Package: libfoo1
Source: libfoo (1.2-1)
Version: 1:1.2-1
Architecture: amd64
Depends: libbar | libbaz, libc6

Package: libc6
Version: 2.36-9
Architecture: amd64
";

const UPDATES_INDEX: &str = "\
Package: hello
Version: 9.9-1
Architecture: amd64

Package: libbar
Version: 0.5-1
Architecture: amd64
Depends: hello
";

fn main_source() -> RepositorySource {
    RepositorySource::new("http://mirror.test/debian", "bookworm", &["main"], &["amd64"])
}

fn updates_source() -> RepositorySource {
    RepositorySource::new(
        "http://mirror.test/debian/",
        "bookworm-updates",
        &["main"],
        &["amd64"],
    )
}

fn index_url(source: &RepositorySource) -> String {
    let source = Arc::new(source.clone());
    RepositorySource::repositories(&source)
        .next()
        .expect("one repository")
        .index_url()
}

/// What: Build an index from a cache directory seeded with both indexes.
///
/// Output:
/// - The merged index and the cache dir guard.
fn seeded_index() -> (PackageIndex, tempfile::TempDir) {
    let cache = tempfile::tempdir().expect("tempdir");
    let fetcher = HttpIndexFetcher::new(cache.path());
    let sources = [main_source(), updates_source()];
    for (source, text) in sources.iter().zip([MAIN_INDEX, UPDATES_INDEX]) {
        std::fs::write(fetcher.cache_path(&index_url(source)), text).expect("seed cache");
    }
    let index = PackageIndex::build(&sources, &fetcher).expect("index");
    (index, cache)
}

#[test]
/// What: Indexes merge from the cache with first-repository-wins.
///
/// Inputs:
/// - Main and updates indexes both defining `hello`.
///
/// Output:
/// - Four ids; `hello` keeps the main version and archive URL.
///
/// Details:
/// - The cache file name is derived from the index URL only.
fn index_merges_cached_repositories() {
    let (index, _cache) = seeded_index();
    assert_eq!(index.len(), 4);
    let hello = index.get("hello").expect("hello");
    assert_eq!(hello.version(), "2.10-3");
    assert_eq!(
        hello.archive_url(),
        "http://mirror.test/debian/pool/main/h/hello/hello_2.10-3_amd64.deb"
    );
    assert_eq!(
        index.get("libfoo1").expect("libfoo1").archive_url(),
        "http://mirror.test/debian/pool/main/libf/libfoo/libfoo1_1.2-1_amd64.deb"
    );
    assert_eq!(
        index.get("libbar").expect("libbar").repository().index_url(),
        "http://mirror.test/debian/dists/bookworm-updates/main/binary-amd64/Packages.gz"
    );
}

#[test]
/// What: Closure follows first alternatives across repositories and honours exclusions.
///
/// Inputs:
/// - `hello` with `libc6` excluded; `libbar` depends back on `hello`.
///
/// Output:
/// - `{hello, libbar, libfoo1}`; `libbaz` never appears.
///
/// Details:
/// - The cycle through `hello` terminates.
fn closure_across_repositories() {
    let (index, _cache) = seeded_index();
    let exclude = HashSet::from(["libc6".to_string()]);
    let deps = closure("hello", &index, &exclude).expect("closure");
    let expected: BTreeSet<String> =
        ["hello", "libbar", "libfoo1"].iter().map(ToString::to_string).collect();
    assert_eq!(deps, expected);

    let all = closure("hello", &index, &HashSet::new()).expect("closure");
    assert!(all.contains("libc6"));
}

/// Materializer that only computes where a package would be unpacked.
struct PlannedRoots(PathBuf);

impl Materializer for PlannedRoots {
    fn materialize(&self, record: &debroot::index::PackageRecord) -> debroot::Result<PathBuf> {
        Ok(self.0.join(record.id()))
    }
}

#[test]
/// What: Materialized roots follow closure order and skip ids missing from the index.
///
/// Inputs:
/// - Closure plus an id absent from every repository.
///
/// Output:
/// - One root per known id, in sorted order.
///
/// Details:
/// - Sorted order is the overlay priority order.
fn materialize_closure_in_order() {
    let (index, _cache) = seeded_index();
    let mut ids = closure("hello", &index, &HashSet::new()).expect("closure");
    ids.insert("not-in-any-repo".to_string());
    let roots = materialize_all(&ids, &index, &PlannedRoots(PathBuf::from("/cache/unpacked")))
        .expect("materialize");
    let names: Vec<String> = roots
        .iter()
        .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["hello", "libbar", "libc6", "libfoo1"]);
}

#[test]
/// What: An index URL missing from the cache and unreachable fails the build.
///
/// Inputs:
/// - Empty cache and a reserved, unresolvable host name.
///
/// Output:
/// - `RepositoryUnreachable` naming the URL; no partial cache file left behind.
///
/// Details:
/// - Fetch failures are never retried.
fn unreachable_repository_is_fatal() {
    let cache = tempfile::tempdir().expect("tempdir");
    let fetcher = HttpIndexFetcher::new(cache.path());
    let source = RepositorySource::new("http://repo.invalid/debian", "x", &["main"], &["amd64"]);
    let url = index_url(&source);
    match fetcher.fetch(&url) {
        Err(debroot::Error::RepositoryUnreachable { url: failed, .. }) => assert_eq!(failed, url),
        other => panic!("expected RepositoryUnreachable, got {other:?}"),
    }
    assert!(!fetcher.cache_path(&url).exists());
}
