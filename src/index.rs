//! Package index assembled from one or more Debian-style repositories.
//!
//! The index is built once per run by expanding every [`RepositorySource`] into
//! its (component, architecture) repositories, fetching each `Packages` index
//! through an [`IndexFetcher`], and merging the stanzas into a single
//! id → [`PackageRecord`] map. The first repository to define an id wins; later
//! duplicates are dropped with a warning. After construction the index is
//! read-only.

mod control;
mod fetch;
mod repository;

pub use control::parse_packages;
pub use fetch::{HttpIndexFetcher, IndexFetcher};
pub use repository::{ArchKind, Repository, RepositorySource};

use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// What: Metadata of one package as read from a repository index.
#[derive(Debug, Clone)]
pub struct PackageRecord {
    id: String,
    fields: HashMap<String, String>,
    repository: Arc<Repository>,
}

impl PackageRecord {
    /// Create a record; `fields` must contain `Version`.
    pub fn new(
        id: impl Into<String>,
        fields: HashMap<String, String>,
        repository: Arc<Repository>,
    ) -> Self {
        Self {
            id: id.into(),
            fields,
            repository,
        }
    }

    /// Package id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw field value, e.g. `Depends`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// `Version` field (empty if somehow absent).
    #[must_use]
    pub fn version(&self) -> &str {
        self.field("Version").unwrap_or_default()
    }

    /// Repository the record was read from.
    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Download URL of the package archive in its repository's pool.
    #[must_use]
    pub fn archive_url(&self) -> String {
        self.repository.archive_url(&self.id, self)
    }
}

/// What: Merged id → record map over every configured repository.
#[derive(Debug, Default)]
pub struct PackageIndex {
    packages: HashMap<String, PackageRecord>,
}

impl PackageIndex {
    /// What: Fetch and merge the indexes of every repository of every source.
    ///
    /// Inputs:
    /// - `sources`: Repository descriptors in priority order.
    /// - `fetcher`: Index text provider.
    ///
    /// Output:
    /// - The merged index, or `RepositoryUnreachable` from the first failed fetch.
    ///
    /// Details:
    /// - First occurrence of an id wins; duplicates are logged and dropped.
    /// - Fetch failures are not retried.
    pub fn build(sources: &[RepositorySource], fetcher: &dyn IndexFetcher) -> Result<Self> {
        let mut index = Self::default();
        for source in sources {
            let source = Arc::new(source.clone());
            for repo in RepositorySource::repositories(&source) {
                let url = repo.index_url();
                let text = fetcher.fetch(&url)?;
                let repo = Arc::new(repo);
                let before = index.len();
                for (id, fields) in parse_packages(&text) {
                    index.insert(PackageRecord::new(id, fields, Arc::clone(&repo)));
                }
                tracing::info!(
                    url = %url,
                    added = index.len() - before,
                    total = index.len(),
                    "merged repository index"
                );
            }
        }
        Ok(index)
    }

    /// What: Add a record unless its id is already present.
    ///
    /// Output:
    /// - `true` when inserted, `false` when dropped as a duplicate.
    pub fn insert(&mut self, record: PackageRecord) -> bool {
        if self.packages.contains_key(record.id()) {
            tracing::warn!(package = %record.id(), "duplicate package found; keeping first");
            return false;
        }
        self.packages.insert(record.id.clone(), record);
        true
    }

    /// Record for `id`, if known.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PackageRecord> {
        self.packages.get(id)
    }

    /// Number of distinct ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the index holds no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
