//! Repository descriptors and the URL layout of a Debian-style archive.

use super::PackageRecord;
use std::sync::Arc;

/// Index file name under each `dists/.../binary-<arch>/` directory.
const INDEX_FILE: &str = "Packages.gz";

/// What: One archive mirror with the components and architectures to read.
///
/// Details:
/// - Expands into one [`Repository`] per (component, architecture) pair.
/// - Deserializes from the job file's `repos` entries; both `base_url` and
///   `baseURL` spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RepositorySource {
    /// Mirror root, e.g. `http://archive.ubuntu.com/ubuntu`.
    #[serde(alias = "baseURL", alias = "base")]
    pub base_url: String,
    /// Release name, e.g. `quantal`.
    pub distribution: String,
    /// Components such as `main` or `universe`.
    pub components: Vec<String>,
    /// Architectures such as `amd64`, or `source`.
    #[serde(alias = "arches")]
    pub architectures: Vec<String>,
}

impl RepositorySource {
    /// Build a source from its parts.
    pub fn new(
        base_url: impl Into<String>,
        distribution: impl Into<String>,
        components: &[&str],
        architectures: &[&str],
    ) -> Self {
        Self {
            base_url: base_url.into(),
            distribution: distribution.into(),
            components: components.iter().map(ToString::to_string).collect(),
            architectures: architectures.iter().map(ToString::to_string).collect(),
        }
    }

    /// What: Expand into every (component, architecture) repository.
    ///
    /// Inputs:
    /// - `source`: Shared handle; each repository keeps a reference to it.
    ///
    /// Output:
    /// - Repositories in component-major order.
    ///
    /// Details:
    /// - Pure derivation; nothing is cached on the source.
    pub fn repositories(source: &Arc<Self>) -> impl Iterator<Item = Repository> + '_ {
        source.components.iter().flat_map(move |component| {
            source
                .architectures
                .iter()
                .map(move |arch| Repository::new(Arc::clone(source), component, arch))
        })
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Whether a repository carries source or binary packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchKind {
    /// `source-<arch>` index.
    Source,
    /// `binary-<arch>` index.
    Binary,
}

impl ArchKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Binary => "binary",
        }
    }
}

/// What: A single (component, architecture) slice of a [`RepositorySource`].
#[derive(Debug, Clone)]
pub struct Repository {
    source: Arc<RepositorySource>,
    component: String,
    arch: String,
}

impl Repository {
    /// Create a repository slice.
    pub fn new(source: Arc<RepositorySource>, component: &str, arch: &str) -> Self {
        Self {
            source,
            component: component.to_string(),
            arch: arch.to_string(),
        }
    }

    /// Component name.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Architecture name.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// `source` only for the `source` pseudo-architecture.
    #[must_use]
    pub fn arch_kind(&self) -> ArchKind {
        if self.arch == "source" {
            ArchKind::Source
        } else {
            ArchKind::Binary
        }
    }

    /// What: URL of the compressed package index for this slice.
    ///
    /// Output:
    /// - `{base}/dists/{distribution}/{component}/{kind}-{arch}/Packages.gz`.
    #[must_use]
    pub fn index_url(&self) -> String {
        format!(
            "{}/dists/{}/{}/{}-{}/{INDEX_FILE}",
            self.source.base(),
            self.source.distribution,
            self.component,
            self.arch_kind().as_str(),
            self.arch
        )
    }

    /// What: URL of the `.deb` archive for a package in this slice's pool.
    ///
    /// Inputs:
    /// - `package_id`: Package name.
    /// - `record`: Metadata read from this repository's index.
    ///
    /// Output:
    /// - `{base}/pool/{component}/{bucket}/{source}/{id}_{version}_{arch}.deb`.
    ///
    /// Details:
    /// - Any epoch (`N:`) is stripped from the version.
    /// - The source name is the first token of `Source`, defaulting to the id.
    /// - The bucket is the first four characters for `lib*` sources, else the first one.
    /// - `Architecture` from the record wins over the repository architecture.
    #[must_use]
    pub fn archive_url(&self, package_id: &str, record: &PackageRecord) -> String {
        let version = record.version();
        let version = version.split_once(':').map_or(version, |(_, v)| v);
        let source = record
            .field("Source")
            .and_then(|s| s.split_whitespace().next())
            .unwrap_or(package_id);
        let bucket = pool_bucket(source);
        let arch = record.field("Architecture").unwrap_or(&self.arch);
        format!(
            "{}/pool/{}/{bucket}/{source}/{package_id}_{version}_{arch}.deb",
            self.source.base(),
            self.component,
        )
    }
}

/// Pool directory letter(s) for a source package name.
fn pool_bucket(source: &str) -> &str {
    let take = if source.starts_with("lib") { 4 } else { 1 };
    source
        .char_indices()
        .nth(take)
        .map_or(source, |(end, _)| &source[..end])
}
