//! Dependency parsing and closure resolution over a repository index.

mod parse;
mod resolve;
mod version;

pub use parse::{Dependency, parse_depends};
pub use resolve::closure;
pub use version::{VersionConstraint, VersionOp};
