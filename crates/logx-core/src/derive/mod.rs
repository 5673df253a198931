//! # Derived Property Calculator
//!
//! [`derive`] computes a node's properties from its children's, caching the
//! result on the node. Children are derived first (and hit their own caches
//! when shared), so each node's per-kind hook runs exactly once per node no
//! matter how many parents reach it.
//!
//! ## Cache Protocol
//!
//! The slot goes `Unset -> InProgress -> Computed`. Finding a node
//! `InProgress` means a derivation depends on itself (a CTE consumer inside
//! its own producer, say) and fails with an invariant violation. Another
//! thread reaching a node mid-derivation gets the same error instead of
//! waiting; sessions are single-writer. A failed
//! derivation puts the slot back to `Unset`. The slot lock is never held
//! while children are derived.
//!
//! ## Per-Kind Hooks
//!
//! Every logical kind has a hook returning [`LocalProps`]: output columns, max
//! cardinality, keys, constraint and statistics. Outer references follow one
//! rule for all kinds and are computed here, as is the final clamp that keeps
//! the statistics row count within the max-cardinality bound.
//!
//! Hooks only see an [`ExprHandle`]: the node, the session, and the children's
//! already-derived properties.

mod join;
mod leaf;
mod limit;
mod project;
mod scalar;
mod unary;

use crate::column::ColumnSet;
use crate::constraint::PropConstraint;
use crate::error::{OptError, Result};
use crate::expr::{LogicalOp, Operator, ScalarOp, ScalarValue};
use crate::node::{CacheSlot, ExprNode, ExprRef};
use crate::properties::{DerivedProps, KeyCollection, MaxCard, RelationalProps, ScalarProps};
use crate::session::OptimizerSession;
use crate::stats::{bound_statistics, Statistics};
use std::sync::Arc;
use tracing::trace;

/// Read-only view of a node and its children's derived properties.
pub struct ExprHandle<'a> {
    node: &'a ExprRef,
    session: &'a OptimizerSession,
    children: Vec<DerivedProps>,
}

impl<'a> ExprHandle<'a> {
    /// Derive (or fetch) the properties of every child of `node`.
    pub fn attach(node: &'a ExprRef, session: &'a OptimizerSession) -> Result<Self> {
        let children = node
            .children()
            .iter()
            .map(|child| derive(child, session))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            node,
            session,
            children,
        })
    }

    pub fn node(&self) -> &ExprRef {
        self.node
    }

    pub fn op(&self) -> &Operator {
        self.node.op()
    }

    pub fn session(&self) -> &OptimizerSession {
        self.session
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    pub fn child_node(&self, index: usize) -> Result<&ExprRef> {
        self.node.child(index)
    }

    pub fn child_props(&self, index: usize) -> Result<&DerivedProps> {
        self.children.get(index).ok_or_else(|| {
            OptError::invariant(format!("{} has no child {}", self.node.op(), index))
        })
    }

    pub fn children_props(&self) -> &[DerivedProps] {
        &self.children
    }

    pub fn relational(&self, index: usize) -> Result<&Arc<RelationalProps>> {
        self.child_props(index)?.as_relational().ok_or_else(|| {
            OptError::invariant(format!(
                "child {} of {} is not relational",
                index,
                self.node.op()
            ))
        })
    }

    pub fn scalar(&self, index: usize) -> Result<&Arc<ScalarProps>> {
        self.child_props(index)?.as_scalar().ok_or_else(|| {
            OptError::invariant(format!(
                "child {} of {} is not scalar",
                index,
                self.node.op()
            ))
        })
    }
}

/// What a per-kind hook computes.
pub(crate) struct LocalProps {
    pub output_columns: ColumnSet,
    pub max_card: MaxCard,
    pub keys: KeyCollection,
    pub constraint: PropConstraint,
    pub stats: Arc<Statistics>,
}

impl LocalProps {
    /// Everything taken from `child` unchanged.
    fn pass_through(child: &RelationalProps) -> Self {
        Self {
            output_columns: child.output_columns.clone(),
            max_card: child.max_card,
            keys: child.keys.clone(),
            constraint: child.constraint.clone(),
            stats: Arc::clone(&child.stats),
        }
    }
}

/// Properties of `node`, computed on first use and cached on the node.
pub fn derive(node: &ExprRef, session: &OptimizerSession) -> Result<DerivedProps> {
    {
        let mut slot = node.cache();
        if let CacheSlot::Computed(props) = &*slot {
            trace!(op = %node.op(), "derived properties cache hit");
            return Ok(props.clone());
        }
        if matches!(*slot, CacheSlot::InProgress) {
            return Err(OptError::invariant(format!(
                "re-entrant derivation of {}",
                node.op()
            )));
        }
        *slot = CacheSlot::InProgress;
    }

    let result = compute(node, session);

    let mut slot = node.cache();
    match result {
        Ok(props) => {
            *slot = CacheSlot::Computed(props.clone());
            Ok(props)
        }
        Err(err) => {
            *slot = CacheSlot::Unset;
            Err(err)
        }
    }
}

fn compute(node: &ExprRef, session: &OptimizerSession) -> Result<DerivedProps> {
    let handle = ExprHandle::attach(node, session)?;
    session.record_derivation();
    trace!(op = %node.op(), "deriving properties");
    match node.op() {
        Operator::Logical(op) => Ok(DerivedProps::Relational(Arc::new(derive_relational(
            &handle, op,
        )?))),
        Operator::Scalar(op) => Ok(DerivedProps::Scalar(Arc::new(scalar::derive_scalar(
            &handle, op,
        )?))),
    }
}

fn derive_relational(handle: &ExprHandle<'_>, op: &LogicalOp) -> Result<RelationalProps> {
    let local = match op {
        LogicalOp::Get { table, columns, .. } => leaf::derive_get(handle, table, columns)?,
        LogicalOp::ConstTableGet { columns, rows } => {
            leaf::derive_const_table(handle, columns, rows)?
        }
        LogicalOp::CteConsumer { cte_id, columns } => {
            leaf::derive_cte_consumer(handle, *cte_id, columns)?
        }
        LogicalOp::Select => unary::derive_select(handle)?,
        LogicalOp::Project => project::derive_project(handle)?,
        LogicalOp::Limit { has_count, .. } => limit::derive_limit(handle, *has_count)?,
        LogicalOp::GbAgg { grouping, stage } => unary::derive_gb_agg(handle, grouping, *stage)?,
        LogicalOp::InnerJoin => join::derive_inner_join(handle)?,
        LogicalOp::LeftOuterJoin => join::derive_left_outer_join(handle)?,
        LogicalOp::CteAnchor { .. } => LocalProps::pass_through(handle.relational(0)?),
        LogicalOp::CteProducer { columns, .. } => unary::derive_cte_producer(handle, columns)?,
    };

    let constraint = if handle.session().config().derive_constraints {
        local.constraint
    } else {
        PropConstraint::default()
    };
    Ok(RelationalProps {
        outer_refs: outer_references(handle, op),
        stats: bound_statistics(&local.stats, local.max_card),
        output_columns: local.output_columns,
        max_card: local.max_card,
        keys: local.keys,
        constraint,
    })
}

/// Columns used by the operator or its scalar children that no relational
/// child produces, plus whatever the children already reference from outside.
fn outer_references(handle: &ExprHandle<'_>, op: &LogicalOp) -> ColumnSet {
    let mut used = op.local_used_columns();
    let mut produced = ColumnSet::new();
    let mut escalated = ColumnSet::new();
    for props in handle.children_props() {
        match props {
            DerivedProps::Relational(r) => {
                produced.extend(r.output_columns.iter().copied());
                escalated.extend(r.outer_refs.iter().copied());
            }
            DerivedProps::Scalar(s) => used.extend(s.used_columns.iter().copied()),
        }
    }
    escalated.extend(used.difference(&produced).copied());
    escalated
}

/// A literal FALSE or NULL predicate: no row qualifies.
fn is_false_or_null(predicate: &ExprNode) -> bool {
    matches!(
        predicate.op(),
        Operator::Scalar(ScalarOp::Const {
            value: ScalarValue::Bool(false) | ScalarValue::Null,
            ..
        })
    )
}
