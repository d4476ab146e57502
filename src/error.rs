//! Error taxonomy shared by the resolver, overlay builder and sandbox lifecycle.
//!
//! Structural problems are fatal and surface as one of these variants. Data
//! quality problems (unknown packages, duplicate ids, unreadable directories
//! during a merge) are logged where they happen and never reach this type,
//! except when the caller explicitly opts into strict listing.

use std::path::PathBuf;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

/// What: Every fatal failure the library can report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A repository index could not be fetched or decompressed.
    #[error("repository index unreachable at {url}: {reason}")]
    RepositoryUnreachable {
        /// Index URL that failed.
        url: String,
        /// Human readable cause.
        reason: String,
    },

    /// A `Depends` item did not match the dependency grammar.
    #[error("invalid dependency item: {item:?}")]
    InvalidDependencyItem {
        /// Offending item, verbatim.
        item: String,
    },

    /// The sandbox destination already holds content.
    #[error("destination {} exists and is not empty", .path.display())]
    DestinationNotEmpty {
        /// Destination directory.
        path: PathBuf,
    },

    /// A directory could not be enumerated while merging and strict listing was requested.
    #[error("cannot list {}: {source}", .path.display())]
    ListingFailure {
        /// Directory that failed to list.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An overlay root was relative, missing, not a directory, or the real root itself.
    #[error("invalid overlay root {}: {reason}", .path.display())]
    InvalidOverlayRoot {
        /// Offending root.
        path: PathBuf,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The job specification is missing required fields or failed to parse.
    #[error("invalid job specification: {0}")]
    InvalidJob(String),

    /// A package could not be downloaded or unpacked.
    #[error("failed to materialize {package}: {reason}")]
    Materialize {
        /// Package id.
        package: String,
        /// Human readable cause.
        reason: String,
    },

    /// A user name could not be resolved to an account.
    #[error("cannot resolve user {name:?}: {reason}")]
    UserLookup {
        /// Requested user name.
        name: String,
        /// Human readable cause.
        reason: String,
    },

    /// Privileges were to be dropped to the superuser, which would drop nothing.
    #[error("refusing to run the workload as the superuser ({name})")]
    SuperuserRefused {
        /// Offending user name.
        name: String,
    },

    /// An external program needed by the run is not installed.
    #[error("required program {0:?} not found in PATH")]
    MissingProgram(&'static str),

    /// The operator refused an action in confirm mode and asked to abort.
    #[error("aborted by operator")]
    Aborted,

    /// Process management failed (fork, wait, privilege change).
    #[error("process error: {0}")]
    Process(String),

    /// Any other filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(unix)]
impl From<nix::Error> for Error {
    fn from(e: nix::Error) -> Self {
        Self::Process(e.to_string())
    }
}
