//! # Built-in Transformation Candidates
//!
//! This crate owns the table that tells the search engine which
//! transformations may fire on each logical operator kind. Candidates fall into
//! two families:
//!
//! ## Exploration (Logical -> Logical)
//!
//! Alternatives that widen the logical search space: join commutativity and
//! associativity, splitting aggregates and limits into local and global stages,
//! pushing aggregates below joins, unnesting subqueries into apply operators.
//!
//! ## Implementation (Logical -> Physical)
//!
//! One physical operator per alternative: table scans, filters, hash and nested
//! loop joins, hash and stream aggregates, CTE sequences.
//!
//! Both tables match exhaustively on [`LogicalOpKind`], so a new operator kind
//! does not compile until it has been given its candidates here.

pub mod exploration;
pub mod implementation;

use logx_core::error::Result;
use logx_core::expr::LogicalOpKind;
use logx_core::xform::{XformRegistry, XformRegistryBuilder, XformSet};

/// Every transformation worth trying on an expression of `kind`.
pub fn candidates(kind: LogicalOpKind) -> XformSet {
    exploration::candidates(kind).union(&implementation::candidates(kind))
}

/// Registry holding [`candidates`] for every operator kind.
///
/// This is the standard configuration for the search engine.
pub fn default_xform_registry() -> Result<XformRegistry> {
    LogicalOpKind::ALL
        .into_iter()
        .fold(XformRegistryBuilder::new(), |builder, kind| {
            builder.register(kind, candidates(kind))
        })
        .build()
}
