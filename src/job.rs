//! Job file: which package to sandbox, where to find it and what to run.

use crate::error::{Error, Result};
use crate::index::RepositorySource;
use crate::sandbox::EnvValue;
use crate::util::config::Settings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

/// Package ids cut from every closure unless configured otherwise.
pub const DEFAULT_EXCLUDE: &[&str] = &["libc6"];

/// Paths always taken from the host unless configured otherwise.
pub const DEFAULT_SACRED: &[&str] = &["/home", "/tmp"];

/// Prefixes where existing host files win unless configured otherwise.
pub const DEFAULT_PREFER_EXISTING: &[&str] = &["/etc"];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// What: Effective exclusion and overlay policy for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Package ids cut from the closure.
    pub exclude: HashSet<String>,
    /// Paths always taken from the host.
    pub sacred: Vec<String>,
    /// Prefixes where an existing host file wins.
    pub prefer_existing: Vec<String>,
}

impl Policy {
    /// What: Add command-line additions on top of the resolved lists.
    #[must_use]
    pub fn extended(mut self, sacred: &[String], prefer_existing: &[String]) -> Self {
        self.sacred.extend(sacred.iter().cloned());
        self.prefer_existing.extend(prefer_existing.iter().cloned());
        self
    }
}

/// What: Parsed job specification.
///
/// Details:
/// - YAML document; JSON works too since it is a YAML subset.
/// - `exclude`, `sacred` and `prefer_existing` are `None` when omitted so that
///   settings and built-in defaults can fill them in; see [`JobSpec::policy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    /// Root package id.
    pub package: String,
    /// Repositories in priority order.
    pub repos: Vec<RepositorySource>,
    /// Command to run inside the sandbox.
    #[serde(default)]
    pub command: Vec<String>,
    /// Extra environment for the command.
    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
    /// Package ids cut from the closure.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    /// Paths always taken from the host.
    #[serde(default, alias = "never_overlay")]
    pub sacred: Option<Vec<String>>,
    /// Prefixes where an existing host file wins.
    #[serde(default)]
    pub prefer_existing: Option<Vec<String>>,
}

impl JobSpec {
    /// What: Parse and validate a job from text.
    ///
    /// Output:
    /// - Job, or `InvalidJob` with the parser's message.
    pub fn parse(text: &str) -> Result<Self> {
        let job: Self =
            serde_norway::from_str(text).map_err(|e| Error::InvalidJob(e.to_string()))?;
        job.validate()?;
        Ok(job)
    }

    /// Parse and validate a job from a reader (e.g. stdin).
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    /// What: Load a job from `path`, or from stdin when `path` is `None` or `-`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p != Path::new("-") => {
                tracing::debug!(path = %p.display(), "reading job file");
                let text = std::fs::read_to_string(p)
                    .map_err(|e| Error::InvalidJob(format!("cannot read {}: {e}", p.display())))?;
                Self::parse(&text)
            }
            _ => {
                tracing::debug!("reading job from stdin");
                Self::from_reader(std::io::stdin().lock())
            }
        }
    }

    /// What: Check required fields.
    ///
    /// Details:
    /// - `package` must be non-blank and `repos` non-empty; every repository
    ///   needs a base URL, a distribution, components and architectures.
    pub fn validate(&self) -> Result<()> {
        if self.package.trim().is_empty() {
            return Err(Error::InvalidJob("`package` must not be empty".to_string()));
        }
        if self.repos.is_empty() {
            return Err(Error::InvalidJob("`repos` must list at least one repository".to_string()));
        }
        for (i, repo) in self.repos.iter().enumerate() {
            if repo.base_url.trim().is_empty() || repo.distribution.trim().is_empty() {
                return Err(Error::InvalidJob(format!(
                    "repository {i} needs a base URL and a distribution"
                )));
            }
            if repo.components.is_empty() || repo.architectures.is_empty() {
                return Err(Error::InvalidJob(format!(
                    "repository {i} needs at least one component and architecture"
                )));
            }
        }
        Ok(())
    }

    /// What: Resolve the policy lists.
    ///
    /// Details:
    /// - Each list comes from the job when set, else from `settings`, else from
    ///   the built-in default.
    #[must_use]
    pub fn policy(&self, settings: &Settings) -> Policy {
        let pick = |job: &Option<Vec<String>>, conf: &Option<Vec<String>>, default: &[&str]| {
            job.clone()
                .or_else(|| conf.clone())
                .unwrap_or_else(|| owned(default))
        };
        Policy {
            exclude: pick(&self.exclude, &settings.exclude, DEFAULT_EXCLUDE)
                .into_iter()
                .collect(),
            sacred: pick(&self.sacred, &settings.sacred, DEFAULT_SACRED),
            prefer_existing: pick(
                &self.prefer_existing,
                &settings.prefer_existing,
                DEFAULT_PREFER_EXISTING,
            ),
        }
    }
}
