//! # Expression Nodes
//!
//! An [`ExprNode`] is an operator plus an ordered list of shared children. Nodes
//! are immutable once built and handed around as [`ExprRef`] (`Arc<ExprNode>`),
//! so the same child may hang under several parents: a DAG, not a tree.
//! Editing a plan means building new nodes, usually via [`remap_subtree`].
//!
//! ## Identity
//!
//! Two nodes *match* when their operators are equal (kind and parameters
//! compared by value) and their children are pairwise the *same* shared node.
//! Children are compared by pointer, never recursively: callers deduplicate
//! bottom-up, so equal subtrees are already the same `Arc`. The hash combines
//! the operator's hash with the children's cached hashes and is computed once at
//! construction.
//!
//! ## Property Cache
//!
//! Each node owns a three-state slot (`Unset`, `InProgress`, `Computed`). Only
//! [`crate::derive`] writes it; once computed it never changes.

use crate::column::{ColumnMapping, ColumnRegistry};
use crate::error::{OptError, Result};
use crate::expr::{BoolOp, LogicalOp, Operator, ScalarOp};
use crate::properties::DerivedProps;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a node.
pub type ExprRef = Arc<ExprNode>;

/// State of a node's derived-property cache.
///
/// Reaching an `InProgress` slot is an error, not a wait: derivation of a
/// session's plan is single-writer, so a second visitor is either a cycle or
/// a concurrent caller, and both are rejected with `InvariantViolation`.
#[derive(Debug, Clone)]
pub(crate) enum CacheSlot {
    Unset,
    /// Derivation of this node has started and not finished.
    InProgress,
    Computed(DerivedProps),
}

pub struct ExprNode {
    op: Operator,
    children: Vec<ExprRef>,
    hash: u64,
    cache: Mutex<CacheSlot>,
}

/// Expected nature of a child position.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Relational,
    Scalar,
    ProjectList,
    ProjectElement,
}

impl Slot {
    fn accepts(self, child: &ExprNode) -> bool {
        match self {
            Slot::Relational => child.op.is_logical(),
            Slot::Scalar => child.op.is_scalar(),
            Slot::ProjectList => matches!(child.op, Operator::Scalar(ScalarOp::ProjectList)),
            Slot::ProjectElement => {
                matches!(child.op, Operator::Scalar(ScalarOp::ProjectElement { .. }))
            }
        }
    }
}

/// Shape of an operator's child list.
enum Shape {
    Fixed(&'static [Slot]),
    /// Any number of children of one slot, at least the given count.
    Variadic(Slot, usize),
}

fn shape(op: &Operator) -> Shape {
    use Slot::*;
    match op {
        Operator::Logical(l) => Shape::Fixed(match l {
            LogicalOp::Get { .. } | LogicalOp::ConstTableGet { .. } | LogicalOp::CteConsumer { .. } => {
                &[]
            }
            LogicalOp::Select => &[Relational, Scalar],
            LogicalOp::Project | LogicalOp::GbAgg { .. } => &[Relational, ProjectList],
            LogicalOp::Limit { .. } => &[Relational, Scalar, Scalar],
            LogicalOp::InnerJoin | LogicalOp::LeftOuterJoin => &[Relational, Relational, Scalar],
            LogicalOp::CteAnchor { .. } | LogicalOp::CteProducer { .. } => &[Relational],
        }),
        Operator::Scalar(s) => match s {
            ScalarOp::Ident { .. } | ScalarOp::Const { .. } => Shape::Fixed(&[]),
            ScalarOp::Cmp { .. } => Shape::Fixed(&[Scalar, Scalar]),
            ScalarOp::BoolExpr { op: BoolOp::Not } => Shape::Fixed(&[Scalar]),
            ScalarOp::BoolExpr { .. } => Shape::Variadic(Scalar, 1),
            ScalarOp::NullTest { .. } | ScalarOp::ProjectElement { .. } => Shape::Fixed(&[Scalar]),
            ScalarOp::Func { .. } | ScalarOp::AggFunc { .. } => Shape::Variadic(Scalar, 0),
            ScalarOp::ProjectList => Shape::Variadic(ProjectElement, 0),
            ScalarOp::Subquery { .. } => Shape::Fixed(&[Relational]),
        },
    }
}

fn validate(op: &Operator, children: &[ExprRef]) -> Result<()> {
    let shape_ok = match shape(op) {
        Shape::Fixed(slots) => {
            slots.len() == children.len()
                && slots.iter().zip(children).all(|(slot, c)| slot.accepts(c))
        }
        Shape::Variadic(slot, min) => {
            children.len() >= min && children.iter().all(|c| slot.accepts(c))
        }
    };
    if !shape_ok {
        let kinds: Vec<String> = children.iter().map(|c| c.op.to_string()).collect();
        return Err(OptError::unsupported(format!(
            "{} cannot take children [{}]",
            op,
            kinds.join(", ")
        )));
    }
    if let Operator::Logical(LogicalOp::ConstTableGet { columns, rows }) = op {
        if rows.iter().any(|row| row.len() != columns.len()) {
            return Err(OptError::unsupported(format!(
                "constant table rows must have {} values",
                columns.len()
            )));
        }
    }
    Ok(())
}

impl ExprNode {
    /// Build a node, checking that `children` fit the operator's shape.
    pub fn new(op: Operator, children: Vec<ExprRef>) -> Result<ExprRef> {
        validate(&op, &children)?;
        let mut hasher = DefaultHasher::new();
        op.hash(&mut hasher);
        for child in &children {
            child.hash.hash(&mut hasher);
        }
        Ok(Arc::new(ExprNode {
            op,
            children,
            hash: hasher.finish(),
            cache: Mutex::new(CacheSlot::Unset),
        }))
    }

    pub fn logical(op: LogicalOp, children: Vec<ExprRef>) -> Result<ExprRef> {
        Self::new(Operator::Logical(op), children)
    }

    pub fn scalar(op: ScalarOp, children: Vec<ExprRef>) -> Result<ExprRef> {
        Self::new(Operator::Scalar(op), children)
    }

    pub fn op(&self) -> &Operator {
        &self.op
    }

    pub fn children(&self) -> &[ExprRef] {
        &self.children
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Result<&ExprRef> {
        self.children.get(index).ok_or_else(|| {
            OptError::invariant(format!("{} has no child {}", self.op, index))
        })
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Same operator and pairwise identical children.
    pub fn matches(&self, other: &ExprNode) -> bool {
        let matched = self.op == other.op
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| Arc::ptr_eq(a, b));
        debug_assert!(
            !matched || self.hash == other.hash,
            "matching nodes with different hashes: {}",
            self.op
        );
        matched
    }

    pub(crate) fn cache(&self) -> MutexGuard<'_, CacheSlot> {
        // The slot is only swapped whole, so a poisoned lock still holds a
        // consistent value.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Properties already derived for this node, without triggering
    /// derivation.
    pub fn derived(&self) -> Option<DerivedProps> {
        match &*self.cache() {
            CacheSlot::Computed(props) => Some(props.clone()),
            CacheSlot::Unset | CacheSlot::InProgress => None,
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.op, indent = depth * 2)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl PartialEq for ExprNode {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for ExprNode {}

impl Hash for ExprNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExprNode")
            .field("op", &self.op)
            .field("children", &self.children)
            .finish()
    }
}

/// Explain rendering, one operator per line, children indented.
impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Copy the DAG under `root` with every column pushed through `mapping`.
///
/// Shared subtrees stay shared in the copy. The source is left untouched and
/// the copy starts with empty property caches.
pub fn remap_subtree(
    root: &ExprRef,
    registry: &mut ColumnRegistry,
    mapping: &mut ColumnMapping,
    must_exist: bool,
) -> Result<ExprRef> {
    let mut copied: HashMap<*const ExprNode, ExprRef> = HashMap::new();
    remap_node(root, registry, mapping, must_exist, &mut copied)
}

fn remap_node(
    node: &ExprRef,
    registry: &mut ColumnRegistry,
    mapping: &mut ColumnMapping,
    must_exist: bool,
    copied: &mut HashMap<*const ExprNode, ExprRef>,
) -> Result<ExprRef> {
    if let Some(done) = copied.get(&Arc::as_ptr(node)) {
        return Ok(Arc::clone(done));
    }
    let children = node
        .children
        .iter()
        .map(|c| remap_node(c, registry, mapping, must_exist, copied))
        .collect::<Result<Vec<_>>>()?;
    let op = node.op.copy_with_remapped_columns(registry, mapping, must_exist)?;
    let copy = ExprNode::new(op, children)?;
    copied.insert(Arc::as_ptr(node), Arc::clone(&copy));
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MdId;
    use crate::column::{ColumnOrigin, DataType};
    use crate::expr::{CmpOp, ScalarValue};

    fn const_int(v: i64) -> ExprRef {
        ExprNode::scalar(
            ScalarOp::Const {
                value: ScalarValue::Int64(v),
                data_type: DataType::Int64,
            },
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_matches_implies_equal_hash() {
        let shared = const_int(1);
        let a = ExprNode::scalar(ScalarOp::BoolExpr { op: BoolOp::Not }, vec![shared.clone()]).unwrap();
        let b = ExprNode::scalar(ScalarOp::BoolExpr { op: BoolOp::Not }, vec![shared]).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(a.matches(&b));
        assert_eq!(a.hash_value(), b.hash_value());
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_matches_compares_children_by_identity() {
        let a = ExprNode::scalar(ScalarOp::BoolExpr { op: BoolOp::Not }, vec![const_int(1)]).unwrap();
        let b = ExprNode::scalar(ScalarOp::BoolExpr { op: BoolOp::Not }, vec![const_int(1)]).unwrap();
        assert!(!a.matches(&b));
        // Equal content still hashes equally.
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn test_parameters_take_part_in_matching() {
        assert!(!const_int(1).matches(&const_int(2)));
        assert!(const_int(7).matches(&const_int(7)));
    }

    #[test]
    fn test_malformed_shape_is_unsupported() {
        let err = ExprNode::scalar(ScalarOp::Cmp { op: CmpOp::Eq }, vec![const_int(1)]).unwrap_err();
        assert!(matches!(err, OptError::UnsupportedConstruct(_)));

        let err = ExprNode::logical(LogicalOp::Project, vec![const_int(1), const_int(2)]).unwrap_err();
        assert!(matches!(err, OptError::UnsupportedConstruct(_)));

        let err = ExprNode::logical(
            LogicalOp::ConstTableGet {
                columns: vec![],
                rows: vec![vec![ScalarValue::Int64(1)]],
            },
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, OptError::UnsupportedConstruct(_)));
    }

    #[test]
    fn test_remap_subtree_preserves_sharing() {
        let mut registry = ColumnRegistry::new();
        let a = registry.create_column(
            "a",
            DataType::Int64,
            false,
            ColumnOrigin::Table {
                table: MdId::new(0, 1),
                attno: 0,
            },
        );
        let get = ExprNode::logical(
            LogicalOp::Get {
                table: MdId::new(0, 1),
                alias: "t".into(),
                columns: vec![a],
            },
            vec![],
        )
        .unwrap();
        let pred = ExprNode::scalar(ScalarOp::Cmp { op: CmpOp::Eq }, vec![
            ExprNode::scalar(ScalarOp::Ident { column: a }, vec![]).unwrap(),
            const_int(1),
        ])
        .unwrap();
        let join = ExprNode::logical(LogicalOp::InnerJoin, vec![get.clone(), get, pred]).unwrap();

        let mut mapping = ColumnMapping::new();
        let copy = remap_subtree(&join, &mut registry, &mut mapping, false).unwrap();
        assert!(Arc::ptr_eq(&copy.children()[0], &copy.children()[1]));
        assert_eq!(mapping.len(), 1);
        match copy.children()[0].op() {
            Operator::Logical(LogicalOp::Get { columns, .. }) => assert_eq!(columns, &vec![mapping[&a]]),
            other => panic!("unexpected {}", other),
        }
        assert!(copy.derived().is_none());
    }

    #[test]
    fn test_display_indents_children() {
        let not = ExprNode::scalar(ScalarOp::BoolExpr { op: BoolOp::Not }, vec![const_int(3)]).unwrap();
        assert_eq!(not.to_string(), "BoolExpr Not\n  Const 3\n");
    }
}
