//! Package-level logic: dependency parsing and closure resolution.

pub mod deps;
