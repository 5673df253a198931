//! # Operator Algebra
//!
//! This module defines the closed set of operators a plan node can carry. It is
//! organized into two families:
//!
//! ## Logical Operators (`LogicalOp`)
//! Relational operators describing *what* to compute. Each variant carries only
//! its own parameters; inputs and scalar arguments are the node's children. A
//! `Project`, for instance, has no payload at all: its semantics live entirely
//! in the `ProjectList` child.
//!
//! ## Scalar Operators (`ScalarOp`)
//! Row-level computations: column references, literals, comparisons, boolean
//! connectives, function calls and the project-list plumbing that defines new
//! columns. Scalars are nodes too, so a predicate is a small subtree.
//!
//! ## Kinds
//! `LogicalOpKind` and `ScalarOpKind` strip the payload and keep only the
//! discriminant. The transformation registry is indexed by `LogicalOpKind`,
//! and adding a variant fails to compile until every `match` on the kind
//! handles it.
//!
//! ## Remapping
//! [`Operator::copy_with_remapped_columns`] produces a new operator with every
//! embedded column substituted through the session's column registry. It never
//! touches children; copying a subtree is [`crate::node::remap_subtree`]'s job.

use crate::catalog::MdId;
use crate::column::{ColumnId, ColumnMapping, ColumnRegistry, ColumnSet, DataType};
use crate::error::Result;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Scalar value for literals and statistics bounds.
///
/// Uses `OrderedFloat` for `f64` so that literals take part in Eq/Hash, which
/// node deduplication relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    /// SQL NULL value.
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    /// 64-bit floating point, wrapped in OrderedFloat for Eq/Hash support.
    Float64(OrderedFloat<f64>),
    Utf8(String),
    /// Date as days since Unix epoch (1970-01-01).
    Date(i32),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int32(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
        }
    }
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// SQL comparison. `None` when either side is NULL or the values are of
    /// unrelated types; integers of different widths compare numerically.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int32(a), Self::Int32(b)) => Some(a.cmp(b)),
            (Self::Int64(a), Self::Int64(b)) => Some(a.cmp(b)),
            (Self::Int32(a), Self::Int64(b)) => Some(i64::from(*a).cmp(b)),
            (Self::Int64(a), Self::Int32(b)) => Some(a.cmp(&i64::from(*b))),
            (Self::Float64(a), Self::Float64(b)) => Some(a.cmp(b)),
            (Self::Utf8(a), Self::Utf8(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// The literal as a non-negative row count, if it is one.
    pub fn as_row_count(&self) -> Option<u64> {
        match self {
            Self::Int32(v) => u64::try_from(*v).ok(),
            Self::Int64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
            Self::Utf8(v) => write!(f, "'{}'", v),
            Self::Date(v) => write!(f, "date({})", v),
        }
    }
}

/// Sort key of an ordering specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub column: ColumnId,
    pub ascending: bool,
    pub nulls_first: bool,
}

/// Ordering specification, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderSpec {
    pub keys: Vec<SortKey>,
}

impl OrderSpec {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ascending(columns: &[ColumnId]) -> Self {
        Self {
            keys: columns
                .iter()
                .map(|&column| SortKey {
                    column,
                    ascending: true,
                    nulls_first: false,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> ColumnSet {
        self.keys.iter().map(|k| k.column).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Which part of a split aggregation a `GbAgg` computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggStage {
    /// Single-stage aggregation over the whole input.
    Global,
    /// First half of a split aggregation.
    Local,
    /// Second half, combining partial results.
    Intermediate,
}

/// Logical operators.
///
/// Children, in order:
/// - `Select`: input, predicate.
/// - `Project`, `GbAgg`: input, project list.
/// - `Limit`: input, offset, count.
/// - `InnerJoin`, `LeftOuterJoin`: left, right, predicate.
/// - `CteAnchor`, `CteProducer`: input.
/// - `Get`, `ConstTableGet`, `CteConsumer`: none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Base table read. `columns` follow the relation's column order.
    Get {
        table: MdId,
        alias: String,
        columns: Vec<ColumnId>,
    },
    /// Literal rows. Each row has one value per column.
    ConstTableGet {
        columns: Vec<ColumnId>,
        rows: Vec<Vec<ScalarValue>>,
    },
    Select,
    Project,
    /// Row limit with optional ordering. `global` distinguishes the final limit
    /// from a per-partition one; a `non_removable` limit must survive rewrites.
    Limit {
        order: OrderSpec,
        global: bool,
        has_count: bool,
        non_removable: bool,
    },
    GbAgg {
        grouping: Vec<ColumnId>,
        stage: AggStage,
    },
    InnerJoin,
    LeftOuterJoin,
    /// Scope in which the producer of `cte_id` is visible.
    CteAnchor { cte_id: u32 },
    CteProducer { cte_id: u32, columns: Vec<ColumnId> },
    CteConsumer { cte_id: u32, columns: Vec<ColumnId> },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    /// The operator with its operands swapped: `a < b` is `b > a`.
    pub fn commute(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::NotEq => CmpOp::NotEq,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::LtEq => CmpOp::GtEq,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::GtEq => CmpOp::LtEq,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "<>",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

/// Scalar operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarOp {
    /// Reference to a column.
    Ident { column: ColumnId },
    Const {
        value: ScalarValue,
        data_type: DataType,
    },
    /// Binary comparison of its two children.
    Cmp { op: CmpOp },
    BoolExpr { op: BoolOp },
    /// `child IS NULL`, or `IS NOT NULL` when negated.
    NullTest { negated: bool },
    /// Function call resolved through the catalog.
    Func { func: MdId, return_type: DataType },
    AggFunc {
        func: MdId,
        distinct: bool,
        return_type: DataType,
    },
    /// Children are `ProjectElement`s.
    ProjectList,
    /// Defines `column` as the value of its only child.
    ProjectElement { column: ColumnId },
    /// Scalar subquery: `column` of the relational child's single output row.
    Subquery { column: ColumnId },
}

/// Unified operator enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Logical(LogicalOp),
    Scalar(ScalarOp),
}

/// Kind discriminant (without data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Logical(LogicalOpKind),
    Scalar(ScalarOpKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicalOpKind {
    Get,
    ConstTableGet,
    Select,
    Project,
    Limit,
    GbAgg,
    InnerJoin,
    LeftOuterJoin,
    CteAnchor,
    CteProducer,
    CteConsumer,
}

impl LogicalOpKind {
    pub const COUNT: usize = 11;

    pub const ALL: [LogicalOpKind; Self::COUNT] = [
        LogicalOpKind::Get,
        LogicalOpKind::ConstTableGet,
        LogicalOpKind::Select,
        LogicalOpKind::Project,
        LogicalOpKind::Limit,
        LogicalOpKind::GbAgg,
        LogicalOpKind::InnerJoin,
        LogicalOpKind::LeftOuterJoin,
        LogicalOpKind::CteAnchor,
        LogicalOpKind::CteProducer,
        LogicalOpKind::CteConsumer,
    ];

    /// Dense index in `0..COUNT`, the position in [`Self::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarOpKind {
    Ident,
    Const,
    Cmp,
    BoolExpr,
    NullTest,
    Func,
    AggFunc,
    ProjectList,
    ProjectElement,
    Subquery,
}

impl LogicalOp {
    pub fn kind(&self) -> LogicalOpKind {
        match self {
            LogicalOp::Get { .. } => LogicalOpKind::Get,
            LogicalOp::ConstTableGet { .. } => LogicalOpKind::ConstTableGet,
            LogicalOp::Select => LogicalOpKind::Select,
            LogicalOp::Project => LogicalOpKind::Project,
            LogicalOp::Limit { .. } => LogicalOpKind::Limit,
            LogicalOp::GbAgg { .. } => LogicalOpKind::GbAgg,
            LogicalOp::InnerJoin => LogicalOpKind::InnerJoin,
            LogicalOp::LeftOuterJoin => LogicalOpKind::LeftOuterJoin,
            LogicalOp::CteAnchor { .. } => LogicalOpKind::CteAnchor,
            LogicalOp::CteProducer { .. } => LogicalOpKind::CteProducer,
            LogicalOp::CteConsumer { .. } => LogicalOpKind::CteConsumer,
        }
    }

    /// Columns the operator itself reads, on top of what its scalar children
    /// use.
    pub fn local_used_columns(&self) -> ColumnSet {
        match self {
            LogicalOp::Limit { order, .. } => order.columns(),
            LogicalOp::GbAgg { grouping, .. } => grouping.iter().copied().collect(),
            _ => ColumnSet::new(),
        }
    }

    fn copy_with_remapped_columns(
        &self,
        registry: &mut ColumnRegistry,
        mapping: &mut ColumnMapping,
        must_exist: bool,
    ) -> Result<LogicalOp> {
        let op = match self {
            LogicalOp::Get {
                table,
                alias,
                columns,
            } => LogicalOp::Get {
                table: *table,
                alias: alias.clone(),
                columns: registry.remap_columns(columns, mapping, must_exist)?,
            },
            LogicalOp::ConstTableGet { columns, rows } => LogicalOp::ConstTableGet {
                columns: registry.remap_columns(columns, mapping, must_exist)?,
                rows: rows.clone(),
            },
            LogicalOp::Select => LogicalOp::Select,
            LogicalOp::Project => LogicalOp::Project,
            LogicalOp::Limit {
                order,
                global,
                has_count,
                non_removable,
            } => {
                let mut keys = Vec::with_capacity(order.keys.len());
                for key in &order.keys {
                    keys.push(SortKey {
                        column: registry.remap_column(key.column, mapping, must_exist)?,
                        ..key.clone()
                    });
                }
                LogicalOp::Limit {
                    order: OrderSpec { keys },
                    global: *global,
                    has_count: *has_count,
                    non_removable: *non_removable,
                }
            }
            LogicalOp::GbAgg { grouping, stage } => LogicalOp::GbAgg {
                grouping: registry.remap_columns(grouping, mapping, must_exist)?,
                stage: *stage,
            },
            LogicalOp::InnerJoin => LogicalOp::InnerJoin,
            LogicalOp::LeftOuterJoin => LogicalOp::LeftOuterJoin,
            LogicalOp::CteAnchor { cte_id } => LogicalOp::CteAnchor { cte_id: *cte_id },
            LogicalOp::CteProducer { cte_id, columns } => LogicalOp::CteProducer {
                cte_id: *cte_id,
                columns: registry.remap_columns(columns, mapping, must_exist)?,
            },
            LogicalOp::CteConsumer { cte_id, columns } => LogicalOp::CteConsumer {
                cte_id: *cte_id,
                columns: registry.remap_columns(columns, mapping, must_exist)?,
            },
        };
        Ok(op)
    }
}

impl ScalarOp {
    pub fn kind(&self) -> ScalarOpKind {
        match self {
            ScalarOp::Ident { .. } => ScalarOpKind::Ident,
            ScalarOp::Const { .. } => ScalarOpKind::Const,
            ScalarOp::Cmp { .. } => ScalarOpKind::Cmp,
            ScalarOp::BoolExpr { .. } => ScalarOpKind::BoolExpr,
            ScalarOp::NullTest { .. } => ScalarOpKind::NullTest,
            ScalarOp::Func { .. } => ScalarOpKind::Func,
            ScalarOp::AggFunc { .. } => ScalarOpKind::AggFunc,
            ScalarOp::ProjectList => ScalarOpKind::ProjectList,
            ScalarOp::ProjectElement { .. } => ScalarOpKind::ProjectElement,
            ScalarOp::Subquery { .. } => ScalarOpKind::Subquery,
        }
    }

    fn copy_with_remapped_columns(
        &self,
        registry: &mut ColumnRegistry,
        mapping: &mut ColumnMapping,
        must_exist: bool,
    ) -> Result<ScalarOp> {
        let op = match self {
            ScalarOp::Ident { column } => ScalarOp::Ident {
                column: registry.remap_column(*column, mapping, must_exist)?,
            },
            ScalarOp::ProjectElement { column } => ScalarOp::ProjectElement {
                column: registry.remap_column(*column, mapping, must_exist)?,
            },
            ScalarOp::Subquery { column } => ScalarOp::Subquery {
                column: registry.remap_column(*column, mapping, must_exist)?,
            },
            ScalarOp::Const { .. }
            | ScalarOp::Cmp { .. }
            | ScalarOp::BoolExpr { .. }
            | ScalarOp::NullTest { .. }
            | ScalarOp::Func { .. }
            | ScalarOp::AggFunc { .. }
            | ScalarOp::ProjectList => self.clone(),
        };
        Ok(op)
    }
}

impl Operator {
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::Logical(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Operator::Scalar(_))
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Logical(l) => OpKind::Logical(l.kind()),
            Operator::Scalar(s) => OpKind::Scalar(s.kind()),
        }
    }

    /// A new operator equal to this one except that every embedded column has
    /// been pushed through `mapping`. Children are not copied.
    pub fn copy_with_remapped_columns(
        &self,
        registry: &mut ColumnRegistry,
        mapping: &mut ColumnMapping,
        must_exist: bool,
    ) -> Result<Operator> {
        Ok(match self {
            Operator::Logical(l) => {
                Operator::Logical(l.copy_with_remapped_columns(registry, mapping, must_exist)?)
            }
            Operator::Scalar(s) => {
                Operator::Scalar(s.copy_with_remapped_columns(registry, mapping, must_exist)?)
            }
        })
    }
}

fn write_columns(f: &mut fmt::Formatter<'_>, columns: &[ColumnId]) -> fmt::Result {
    write!(f, "[")?;
    for (i, c) in columns.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", c)?;
    }
    write!(f, "]")
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Logical(op) => match op {
                LogicalOp::Get {
                    table,
                    alias,
                    columns,
                } => {
                    write!(f, "Get {} ({}) ", alias, table)?;
                    write_columns(f, columns)
                }
                LogicalOp::ConstTableGet { columns, rows } => {
                    write!(f, "ConstTableGet {} rows ", rows.len())?;
                    write_columns(f, columns)
                }
                LogicalOp::Select => write!(f, "Select"),
                LogicalOp::Project => write!(f, "Project"),
                LogicalOp::Limit {
                    order,
                    global,
                    has_count,
                    non_removable,
                } => {
                    write!(f, "Limit")?;
                    if *global {
                        write!(f, " global")?;
                    }
                    if !*has_count {
                        write!(f, " no-count")?;
                    }
                    if *non_removable {
                        write!(f, " non-removable")?;
                    }
                    if !order.is_empty() {
                        write!(f, " order ")?;
                        let cols: Vec<ColumnId> = order.keys.iter().map(|k| k.column).collect();
                        write_columns(f, &cols)?;
                    }
                    Ok(())
                }
                LogicalOp::GbAgg { grouping, stage } => {
                    write!(f, "GbAgg {:?} ", stage)?;
                    write_columns(f, grouping)
                }
                LogicalOp::InnerJoin => write!(f, "InnerJoin"),
                LogicalOp::LeftOuterJoin => write!(f, "LeftOuterJoin"),
                LogicalOp::CteAnchor { cte_id } => write!(f, "CteAnchor {}", cte_id),
                LogicalOp::CteProducer { cte_id, columns } => {
                    write!(f, "CteProducer {} ", cte_id)?;
                    write_columns(f, columns)
                }
                LogicalOp::CteConsumer { cte_id, columns } => {
                    write!(f, "CteConsumer {} ", cte_id)?;
                    write_columns(f, columns)
                }
            },
            Operator::Scalar(op) => match op {
                ScalarOp::Ident { column } => write!(f, "Ident {}", column),
                ScalarOp::Const { value, .. } => write!(f, "Const {}", value),
                ScalarOp::Cmp { op } => write!(f, "Cmp {}", op.symbol()),
                ScalarOp::BoolExpr { op } => write!(f, "BoolExpr {:?}", op),
                ScalarOp::NullTest { negated: false } => write!(f, "IsNull"),
                ScalarOp::NullTest { negated: true } => write!(f, "IsNotNull"),
                ScalarOp::Func { func, .. } => write!(f, "Func {}", func),
                ScalarOp::AggFunc { func, distinct, .. } => {
                    write!(f, "AggFunc {}", func)?;
                    if *distinct {
                        write!(f, " distinct")?;
                    }
                    Ok(())
                }
                ScalarOp::ProjectList => write!(f, "ProjectList"),
                ScalarOp::ProjectElement { column } => write!(f, "ProjectElement {}", column),
                ScalarOp::Subquery { column } => write!(f, "Subquery {}", column),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnOrigin;

    #[test]
    fn test_kind_index_matches_all() {
        for (i, kind) in LogicalOpKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_scalar_value_compare() {
        assert_eq!(
            ScalarValue::Int32(3).compare(&ScalarValue::Int64(5)),
            Some(Ordering::Less)
        );
        assert_eq!(ScalarValue::Null.compare(&ScalarValue::Null), None);
        assert_eq!(ScalarValue::Utf8("a".into()).compare(&ScalarValue::Int64(1)), None);
        assert_eq!(ScalarValue::Int64(-1).as_row_count(), None);
        assert_eq!(ScalarValue::Int64(10).as_row_count(), Some(10));
    }

    #[test]
    fn test_copy_with_remapped_columns_does_not_mutate_source() {
        let mut registry = ColumnRegistry::new();
        let a = registry.create_column("a", DataType::Int64, false, ColumnOrigin::Computed);
        let op = Operator::Logical(LogicalOp::Limit {
            order: OrderSpec::ascending(&[a]),
            global: true,
            has_count: true,
            non_removable: false,
        });

        let mut mapping = ColumnMapping::new();
        let copy = op
            .copy_with_remapped_columns(&mut registry, &mut mapping, false)
            .unwrap();
        let b = mapping[&a];
        assert_ne!(a, b);
        match (&op, &copy) {
            (
                Operator::Logical(LogicalOp::Limit { order: src, .. }),
                Operator::Logical(LogicalOp::Limit { order: dst, global, .. }),
            ) => {
                assert_eq!(src.keys[0].column, a);
                assert_eq!(dst.keys[0].column, b);
                assert!(*global);
            }
            _ => panic!("expected limits"),
        }
    }

    #[test]
    fn test_copy_with_remapped_columns_must_exist() {
        let mut registry = ColumnRegistry::new();
        let a = registry.create_column("a", DataType::Int64, false, ColumnOrigin::Computed);
        let op = Operator::Scalar(ScalarOp::Ident { column: a });
        let err = op
            .copy_with_remapped_columns(&mut registry, &mut ColumnMapping::new(), true)
            .unwrap_err();
        assert!(err.is_lookup_failure());
    }
}
