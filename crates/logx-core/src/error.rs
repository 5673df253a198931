//! # Error Taxonomy
//!
//! Every fallible operation in the core returns [`OptError`]. None of them are
//! retried internally: derivation is a pure computation and the catalog is
//! assumed consistent, so an error aborts the current optimization attempt and
//! the caller decides on a fallback.
//!
//! - [`OptError::LookupFailure`]: an unknown column id or catalog object.
//! - [`OptError::UnsupportedConstruct`]: an operator shape, type or value the
//!   core cannot represent or derive properties for.
//! - [`OptError::InvariantViolation`]: a defect in the core itself (re-entrant
//!   derivation, an operator kind missing from the transformation registry).

/// Errors raised by the logical algebra and property derivation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptError {
    /// An id could not be resolved in the column registry, catalog or CTE table.
    #[error("lookup failure: {0}")]
    LookupFailure(String),
    /// The input uses a construct the core does not support.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
    /// An internal consistency check failed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl OptError {
    pub fn lookup(what: impl Into<String>) -> Self {
        Self::LookupFailure(what.into())
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedConstruct(what.into())
    }

    pub fn invariant(what: impl Into<String>) -> Self {
        Self::InvariantViolation(what.into())
    }

    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::LookupFailure(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = OptError> = std::result::Result<T, E>;
