//! # Optimization Session
//!
//! An `OptimizerSession` owns everything that is scoped to optimizing one
//! query: the column registry, the CTE producer table, the catalog handle and
//! the configuration. Sessions share nothing, so two queries can be optimized
//! side by side with independent column-id spaces.
//!
//! Derivation only ever needs `&OptimizerSession`; the registry is mutated
//! while the plan is being built (leaf construction, subtree copies), not while
//! properties are derived.

use crate::catalog::{Catalog, MdId};
use crate::column::{ColumnOrigin, ColumnRegistry};
use crate::cte::CteInfo;
use crate::derive;
use crate::error::{OptError, Result};
use crate::expr::LogicalOp;
use crate::node::{ExprNode, ExprRef};
use crate::properties::{RelationalProps, ScalarProps};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Configuration for property derivation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Row count assumed for a scan whose relation has no statistics.
    pub default_row_count: f64,
    /// Bytes per row assumed when nothing better is known.
    pub default_row_width: f64,
    /// When false every derived constraint is empty.
    pub derive_constraints: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_row_count: 1000.0,
            default_row_width: 100.0,
            derive_constraints: true,
        }
    }
}

pub struct OptimizerSession {
    columns: ColumnRegistry,
    catalog: Arc<dyn Catalog>,
    cte_info: CteInfo,
    config: SessionConfig,
    derivations: AtomicU64,
}

impl OptimizerSession {
    pub fn new(catalog: Arc<dyn Catalog>, config: SessionConfig) -> Self {
        debug!(?config, "opening optimizer session");
        Self {
            columns: ColumnRegistry::new(),
            catalog,
            cte_info: CteInfo::new(),
            config,
            derivations: AtomicU64::new(0),
        }
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut ColumnRegistry {
        &mut self.columns
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cte_info(&self) -> &CteInfo {
        &self.cte_info
    }

    pub fn cte_info_mut(&mut self) -> &mut CteInfo {
        &mut self.cte_info
    }

    /// Number of per-node derivations run in this session. Cache hits don't
    /// count.
    pub fn derivation_count(&self) -> u64 {
        self.derivations.load(Ordering::Relaxed)
    }

    pub(crate) fn record_derivation(&self) {
        self.derivations.fetch_add(1, Ordering::Relaxed);
    }

    /// Build a `Get` of `table`, allocating one column per relation column.
    pub fn add_get(&mut self, table: MdId, alias: impl Into<String>) -> Result<ExprRef> {
        let relation = self.catalog.relation(&table)?;
        if relation.columns.is_empty() {
            return Err(OptError::unsupported(format!(
                "relation {} has no columns",
                relation.name
            )));
        }
        let columns = relation
            .columns
            .iter()
            .enumerate()
            .map(|(attno, info)| {
                self.columns.create_column(
                    info.name.clone(),
                    info.data_type,
                    info.nullable,
                    ColumnOrigin::Table { table, attno },
                )
            })
            .collect();
        ExprNode::logical(
            LogicalOp::Get {
                table,
                alias: alias.into(),
                columns,
            },
            vec![],
        )
    }

    /// Relational properties of `node`, deriving them if needed.
    pub fn relational_props(&self, node: &ExprRef) -> Result<Arc<RelationalProps>> {
        derive::derive(node, self)?
            .as_relational()
            .cloned()
            .ok_or_else(|| OptError::invariant(format!("{} is not relational", node.op())))
    }

    /// Scalar properties of `node`, deriving them if needed.
    pub fn scalar_props(&self, node: &ExprRef) -> Result<Arc<ScalarProps>> {
        derive::derive(node, self)?
            .as_scalar()
            .cloned()
            .ok_or_else(|| OptError::invariant(format!("{} is not scalar", node.op())))
    }

    /// End the session. Columns allocated by it are gone; nodes outlive it only
    /// as far as callers still hold them.
    pub fn close(self) {
        debug!(
            columns = self.columns.len(),
            ctes = self.cte_info.len(),
            derivations = self.derivation_count(),
            "closing optimizer session"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnInfo, InMemoryCatalog, RelationDescriptor};
    use crate::column::DataType;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.default_row_count, 1000.0);
        assert_eq!(config.default_row_width, 100.0);
        assert!(config.derive_constraints);
    }

    #[test]
    fn test_add_get_allocates_table_columns() {
        let t = MdId::new(0, 7);
        let mut catalog = InMemoryCatalog::new();
        catalog.add_relation(
            RelationDescriptor::new(
                t,
                "t",
                vec![
                    ColumnInfo::new("a", DataType::Int64, false),
                    ColumnInfo::new("b", DataType::Utf8, true),
                ],
            ),
            None,
        );
        let mut session = OptimizerSession::new(Arc::new(catalog), SessionConfig::default());
        let get = session.add_get(t, "t1").unwrap();
        let columns = match get.op() {
            crate::expr::Operator::Logical(LogicalOp::Get { columns, .. }) => columns.clone(),
            other => panic!("unexpected {}", other),
        };
        assert_eq!(columns.len(), 2);
        let b = session.columns().lookup(columns[1]).unwrap();
        assert_eq!(b.name, "b");
        assert!(b.nullable);
        assert_eq!(b.origin, ColumnOrigin::Table { table: t, attno: 1 });

        assert!(session.add_get(MdId::new(0, 8), "x").unwrap_err().is_lookup_failure());
        session.close();
    }

    #[test]
    fn test_sessions_have_independent_column_ids() {
        let catalog: Arc<dyn Catalog> = Arc::new(InMemoryCatalog::new());
        let mut one = OptimizerSession::new(Arc::clone(&catalog), SessionConfig::default());
        let mut two = OptimizerSession::new(catalog, SessionConfig::default());
        let a = one
            .columns_mut()
            .create_column("a", DataType::Int32, true, ColumnOrigin::Computed);
        let b = two
            .columns_mut()
            .create_column("b", DataType::Int32, true, ColumnOrigin::Computed);
        assert_eq!(a, b);
        assert!(one.columns().lookup(a).is_ok());
    }
}
