//! debroot: run a Debian package and its dependency closure from a throwaway
//! symlink overlay of the host root, without installing anything.
//!
//! The pipeline is: load a [`job::JobSpec`], build an [`index::PackageIndex`] from
//! its repositories, compute the dependency closure with
//! [`logic::deps::closure`], unpack every package with a
//! [`materialize::Materializer`], merge the unpacked trees over the host root
//! with [`overlay::build_overlay`] inside a [`sandbox::Sandbox`], and run the
//! workload there.

pub mod error;
pub mod index;
pub mod job;
pub mod logic;
pub mod materialize;
pub mod overlay;
pub mod sandbox;
pub mod util;

pub use error::{Error, Result};
