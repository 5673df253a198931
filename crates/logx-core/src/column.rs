//! # Column Reference Registry
//!
//! Columns are identified by a session-scoped [`ColumnId`]. The registry owns
//! the descriptor of every column allocated during one optimization session;
//! operators and derived properties only ever hold the id.
//!
//! Ids are handed out monotonically and never reused. Two sessions have two
//! registries, so there is no process-wide counter to contend on.
//!
//! ## Remapping
//!
//! Whenever a subtree is duplicated (linking a CTE consumer to its producer,
//! or copying a subtree inside a transformation) the embedded columns are
//! pushed through a [`ColumnMapping`] with [`ColumnRegistry::remap_columns`].
//! With `must_exist = false` unmapped columns get a fresh copy and the mapping
//! is extended, which keeps repeated remaps through the same mapping stable.

use crate::catalog::MdId;
use crate::error::{OptError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Session-unique column identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered set of columns. Ordered so that derived properties print and
/// compare deterministically.
pub type ColumnSet = BTreeSet<ColumnId>;

/// Substitution table used when copying operators.
pub type ColumnMapping = HashMap<ColumnId, ColumnId>;

/// Declared value type of a column or literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int32,
    Int64,
    Float64,
    Utf8,
    Date,
    Bytea,
    Json,
}

impl DataType {
    /// Whether values of this type can be described by interval constraints.
    /// Types without a total order (raw bytes, documents) cannot.
    pub fn is_constrainable(&self) -> bool {
        !matches!(self, DataType::Bytea | DataType::Json)
    }
}

/// Where a column comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnOrigin {
    /// A column read from a base table, `attno` being its position in the
    /// relation descriptor.
    Table { table: MdId, attno: usize },
    /// A column computed by a project element, aggregate, constant table or
    /// subquery.
    Computed,
}

/// Everything the core knows about a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: ColumnId,
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub origin: ColumnOrigin,
}

impl ColumnDescriptor {
    pub fn is_base_table_column(&self) -> bool {
        matches!(self.origin, ColumnOrigin::Table { .. })
    }
}

/// Allocates and owns the columns of one optimization session.
#[derive(Debug, Default)]
pub struct ColumnRegistry {
    next_id: u32,
    columns: HashMap<ColumnId, ColumnDescriptor>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new column. Never returns an id handed out before.
    pub fn create_column(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        nullable: bool,
        origin: ColumnOrigin,
    ) -> ColumnId {
        let id = ColumnId(self.next_id);
        self.next_id += 1;
        self.columns.insert(
            id,
            ColumnDescriptor {
                id,
                name: name.into(),
                data_type,
                nullable,
                origin,
            },
        );
        id
    }

    pub fn lookup(&self, id: ColumnId) -> Result<&ColumnDescriptor> {
        self.columns
            .get(&id)
            .ok_or_else(|| OptError::lookup(format!("column {} is not registered", id)))
    }

    /// Substitute `source` through `mapping`.
    ///
    /// Columns missing from the mapping fail the call when `must_exist` is set;
    /// otherwise each gets exactly one fresh column of the same name, type,
    /// nullability and origin, recorded in `mapping`.
    pub fn remap_columns(
        &mut self,
        source: &[ColumnId],
        mapping: &mut ColumnMapping,
        must_exist: bool,
    ) -> Result<Vec<ColumnId>> {
        source
            .iter()
            .map(|&col| self.remap_column(col, mapping, must_exist))
            .collect()
    }

    pub fn remap_column(
        &mut self,
        col: ColumnId,
        mapping: &mut ColumnMapping,
        must_exist: bool,
    ) -> Result<ColumnId> {
        if let Some(&mapped) = mapping.get(&col) {
            return Ok(mapped);
        }
        if must_exist {
            return Err(OptError::lookup(format!(
                "column {} has no entry in the remapping",
                col
            )));
        }
        let source = self.lookup(col)?.clone();
        let fresh = self.create_column(source.name, source.data_type, source.nullable, source.origin);
        mapping.insert(col, fresh);
        Ok(fresh)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_column_ids_are_fresh() {
        let mut registry = ColumnRegistry::new();
        let a = registry.create_column("a", DataType::Int64, false, ColumnOrigin::Computed);
        let b = registry.create_column("a", DataType::Int64, false, ColumnOrigin::Computed);
        assert_ne!(a, b);
        assert_eq!(registry.lookup(b).unwrap().name, "a");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lookup_unknown_column() {
        let registry = ColumnRegistry::new();
        let err = registry.lookup(ColumnId(42)).unwrap_err();
        assert!(err.is_lookup_failure());
    }

    #[test]
    fn test_remap_must_exist_fails_on_missing_column() {
        let mut registry = ColumnRegistry::new();
        let a = registry.create_column("a", DataType::Int32, true, ColumnOrigin::Computed);
        let mut mapping = ColumnMapping::new();
        let err = registry.remap_columns(&[a], &mut mapping, true).unwrap_err();
        assert!(err.is_lookup_failure());
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_remap_allocates_once_and_is_stable() {
        let mut registry = ColumnRegistry::new();
        let a = registry.create_column("a", DataType::Int32, true, ColumnOrigin::Computed);
        let b = registry.create_column("b", DataType::Utf8, false, ColumnOrigin::Computed);
        let mut mapping = ColumnMapping::new();

        let first = registry.remap_columns(&[a, b, a], &mut mapping, false).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], a);

        let second = registry.remap_columns(&[a, b], &mut mapping, false).unwrap();
        assert_eq!(second, vec![first[0], first[1]]);
        assert_eq!(registry.len(), 4);

        let copy = registry.lookup(first[1]).unwrap();
        assert_eq!(copy.data_type, DataType::Utf8);
        assert!(!copy.nullable);
    }
}
