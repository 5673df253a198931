//! # logx-core: logical algebra and property derivation
//!
//! The logical half of a Cascades-style optimizer. Plans are DAGs of shared,
//! immutable expression nodes; each node computes its logical properties once,
//! on first use, and keeps them for every later reader.
//!
//! ## Module Overview
//!
//! - **`column`**: Session-scoped column registry and column remapping.
//! - **`expr`**: Logical and scalar operator payloads, kind tags, remap-copy.
//! - **`node`**: The shared expression node: structural matching, hashing,
//!   the per-node property cache and subtree copies.
//! - **`derive`**: The property calculator and its per-operator hooks.
//! - **`properties`**: Relational and scalar property records, max
//!   cardinality and key collections.
//! - **`constraint`**: Interval constraints and column equivalence classes.
//! - **`stats`**: Statistics records and derivation formulas.
//! - **`catalog`**: Read-only metadata interface and an in-memory catalog.
//! - **`cte`**: Registry of CTE producers that consumers derive through.
//! - **`session`**: Per-optimization state and configuration.
//! - **`xform`**: Transformation candidates per operator kind.

pub mod catalog;
pub mod column;
pub mod constraint;
pub mod cte;
pub mod derive;
pub mod error;
pub mod expr;
pub mod node;
pub mod properties;
pub mod session;
pub mod stats;
pub mod xform;

pub use column::{ColumnId, ColumnSet, DataType};
pub use error::{OptError, Result};
pub use expr::{LogicalOp, LogicalOpKind, Operator, ScalarOp, ScalarValue};
pub use node::{ExprNode, ExprRef};
pub use properties::{DerivedProps, MaxCard, RelationalProps, ScalarProps};
pub use session::{OptimizerSession, SessionConfig};
pub use xform::{XformId, XformRegistry, XformSet};
