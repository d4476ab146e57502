//! Version relations attached to dependency edges.

use std::fmt;

/// What: One of the five Debian version relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionOp {
    /// `<<` strictly earlier.
    Lt,
    /// `<=` earlier or equal.
    Le,
    /// `=` exactly equal.
    Eq,
    /// `>=` later or equal.
    Ge,
    /// `>>` strictly later.
    Gt,
}

impl VersionOp {
    /// What: Parse a relation token as it appears inside `( ... )`.
    ///
    /// Inputs:
    /// - `token`: Operator text such as `">="`.
    ///
    /// Output:
    /// - `Some(op)` for the five recognised relations, `None` otherwise.
    ///
    /// Details:
    /// - The obsolete single-character `<` and `>` relations are rejected.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "<<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "=" => Some(Self::Eq),
            ">=" => Some(Self::Ge),
            ">>" => Some(Self::Gt),
            _ => None,
        }
    }

    /// Operator text in Debian notation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<<",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Gt => ">>",
        }
    }
}

/// What: Parsed `(operator, version)` pair of a dependency edge.
///
/// Details:
/// - Carried through resolution but never evaluated against candidate versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VersionConstraint {
    op: Option<VersionOp>,
    version: Option<String>,
}

impl VersionConstraint {
    /// Constraint that accepts any version.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            op: None,
            version: None,
        }
    }

    /// Constraint with an explicit relation.
    #[must_use]
    pub fn new(op: VersionOp, version: impl Into<String>) -> Self {
        Self {
            op: Some(op),
            version: Some(version.into()),
        }
    }

    /// Relation, `None` when unconstrained.
    #[must_use]
    pub const fn op(&self) -> Option<VersionOp> {
        self.op
    }

    /// Version operand, `None` when unconstrained.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether the edge carries no version restriction.
    #[must_use]
    pub const fn is_any(&self) -> bool {
        self.op.is_none()
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.op, self.version.as_deref()) {
            (Some(op), Some(v)) => write!(f, "{} {v}", op.as_str()),
            _ => f.write_str("any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Only the five Debian relations are accepted.
    ///
    /// Inputs:
    /// - Valid and obsolete operator tokens.
    ///
    /// Output:
    /// - Valid tokens map to their variant; `<`, `>` and `=>` are rejected.
    ///
    /// Details:
    /// - Guards the fatal `InvalidDependencyItem` path in the parser.
    fn version_op_parse_accepts_debian_relations_only() {
        assert_eq!(VersionOp::parse("<<"), Some(VersionOp::Lt));
        assert_eq!(VersionOp::parse(">="), Some(VersionOp::Ge));
        assert_eq!(VersionOp::parse("="), Some(VersionOp::Eq));
        assert_eq!(VersionOp::parse("<"), None);
        assert_eq!(VersionOp::parse(">"), None);
        assert_eq!(VersionOp::parse("=>"), None);
    }

    #[test]
    fn constraint_display() {
        assert_eq!(VersionConstraint::any().to_string(), "any");
        assert_eq!(
            VersionConstraint::new(VersionOp::Ge, "2.17").to_string(),
            ">= 2.17"
        );
    }
}
