//! # Catalog Interface
//!
//! The catalog resolves metadata ids into immutable descriptors: relation
//! schemas with their keys and distribution columns, function signatures and
//! table-level statistics. Scans read it at leaf construction and derivation
//! time; `Func` scalars read it to learn whether a function returns a set.
//!
//! ## Trait Design
//!
//! `Catalog` sits behind a trait object (`dyn Catalog`) so the embedding
//! optimizer can back it with its real metadata provider. From the core's point
//! of view every call is a synchronous, blocking read; the same id always yields
//! the same descriptor within a session, so nothing is invalidated here.
//! `InMemoryCatalog` is a HashMap-backed implementation populated
//! programmatically, used by tests and tools.

use crate::column::DataType;
use crate::error::{OptError, Result};
use crate::stats::RelationStats;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Metadata provider a descriptor comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SystemId(pub u32);

/// Catalog object id, unique within its system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MdId {
    pub system: SystemId,
    pub object: u64,
}

impl MdId {
    pub fn new(system: u32, object: u64) -> Self {
        Self {
            system: SystemId(system),
            object,
        }
    }
}

impl fmt::Display for MdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.system.0, self.object)
    }
}

/// A column as declared in the relation schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Relation schema.
///
/// `keys` and `distribution_columns` hold positions into `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub mdid: MdId,
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub keys: Vec<Vec<usize>>,
    pub distribution_columns: Vec<usize>,
}

impl RelationDescriptor {
    pub fn new(mdid: MdId, name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            mdid,
            name: name.into(),
            columns,
            keys: Vec::new(),
            distribution_columns: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: Vec<usize>) -> Self {
        self.keys.push(key);
        self
    }

    pub fn with_distribution(mut self, columns: Vec<usize>) -> Self {
        self.distribution_columns = columns;
        self
    }
}

/// Function signature facts the core needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub mdid: MdId,
    pub name: String,
    pub return_type: DataType,
    /// The function may return zero or many rows per input row.
    pub returns_set: bool,
}

/// Catalog provides schema, function and statistics information.
pub trait Catalog: Send + Sync {
    fn relation(&self, mdid: &MdId) -> Result<Arc<RelationDescriptor>>;
    /// Table statistics, `None` when the relation was never analyzed.
    fn relation_stats(&self, mdid: &MdId) -> Option<RelationStats>;
    fn function(&self, mdid: &MdId) -> Result<Arc<FunctionDescriptor>>;
}

/// In-memory catalog for testing and development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    pub relations: HashMap<MdId, Arc<RelationDescriptor>>,
    pub relation_stats: HashMap<MdId, RelationStats>,
    pub functions: HashMap<MdId, Arc<FunctionDescriptor>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_relation(&mut self, relation: RelationDescriptor, stats: Option<RelationStats>) {
        let mdid = relation.mdid;
        self.relations.insert(mdid, Arc::new(relation));
        if let Some(stats) = stats {
            self.relation_stats.insert(mdid, stats);
        }
    }

    pub fn add_function(&mut self, function: FunctionDescriptor) {
        self.functions.insert(function.mdid, Arc::new(function));
    }
}

impl Catalog for InMemoryCatalog {
    fn relation(&self, mdid: &MdId) -> Result<Arc<RelationDescriptor>> {
        self.relations
            .get(mdid)
            .cloned()
            .ok_or_else(|| OptError::lookup(format!("relation {}", mdid)))
    }

    fn relation_stats(&self, mdid: &MdId) -> Option<RelationStats> {
        self.relation_stats.get(mdid).cloned()
    }

    fn function(&self, mdid: &MdId) -> Result<Arc<FunctionDescriptor>> {
        self.functions
            .get(mdid)
            .cloned()
            .ok_or_else(|| OptError::lookup(format!("function {}", mdid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_catalog_lookup() {
        let mut catalog = InMemoryCatalog::new();
        let t = MdId::new(0, 1);
        catalog.add_relation(
            RelationDescriptor::new(t, "t", vec![ColumnInfo::new("a", DataType::Int64, false)])
                .with_key(vec![0]),
            None,
        );
        let rel = catalog.relation(&t).unwrap();
        assert_eq!(rel.keys, vec![vec![0]]);
        assert!(catalog.relation_stats(&t).is_none());
        assert!(catalog.relation(&MdId::new(0, 2)).unwrap_err().is_lookup_failure());
        assert!(catalog.function(&t).unwrap_err().is_lookup_failure());
    }
}
