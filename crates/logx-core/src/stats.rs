//! # Statistics Delegate
//!
//! Statistics are precomputed objects (row count, size, per-column NDV and null
//! fraction) that the core combines and bounds; it never computes histograms
//! or samples data itself. Catalog statistics come keyed by column name
//! ([`RelationStats`]); once attached to a scan they are keyed by session
//! column id ([`Statistics`]).
//!
//! ## Derivation Formulas
//!
//! - **Filter**: output_rows = input_rows * selectivity. Column NDVs are scaled
//!   proportionally to the row reduction ratio.
//! - **Join**: output_rows = |left| * |right| / max(NDV_left_key, NDV_right_key).
//!   A left outer join emits at least every left row.
//! - **Aggregate**: output_rows = product of NDVs of grouping columns, capped by
//!   input rows.
//! - **Project**: input statistics restricted to the output columns, with every
//!   column bound to a literal recorded as a single known value.
//! - **Bounding**: a row count above the max-cardinality bound is truncated on a
//!   fresh copy; a row count within the bound keeps the very same object.
//!
//! ## Selectivity Estimation
//!
//! - **Equality**: 1 / NDV (uniform distribution assumption).
//! - **Range**: fixed 1/3 heuristic.
//! - **Default**: 0.1 (10%) when no better estimate is available.

use crate::catalog::RelationDescriptor;
use crate::column::{ColumnId, ColumnMapping, ColumnSet};
use crate::expr::{BoolOp, CmpOp, Operator, ScalarOp, ScalarValue};
use crate::node::ExprNode;
use crate::properties::MaxCard;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Default filter selectivity when we can't determine it.
pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.1;

/// Selectivity of a range comparison.
pub const RANGE_SELECTIVITY: f64 = 0.33;

/// Statistics of a relational subtree, keyed by column id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub row_count: f64,
    pub total_size_bytes: f64,
    pub column_stats: HashMap<ColumnId, ColumnStatistics>,
}

impl Statistics {
    pub fn new(row_count: f64, total_size_bytes: f64) -> Self {
        Self {
            row_count,
            total_size_bytes,
            column_stats: HashMap::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnId, stats: ColumnStatistics) -> Self {
        self.column_stats.insert(column, stats);
        self
    }

    /// Average bytes per row, `fallback` for an empty relation.
    pub fn avg_row_width(&self, fallback: f64) -> f64 {
        if self.row_count > 0.0 {
            self.total_size_bytes / self.row_count
        } else {
            fallback
        }
    }

    /// Attach catalog statistics to the columns a scan produces. `columns`
    /// follow the relation's column order.
    pub fn from_relation(
        stats: &RelationStats,
        relation: &RelationDescriptor,
        columns: &[ColumnId],
    ) -> Self {
        let mut out = Statistics::new(stats.row_count, stats.total_size_bytes);
        for (info, &column) in relation.columns.iter().zip(columns) {
            if let Some(cs) = stats.column_stats.get(&info.name) {
                out.column_stats.insert(column, cs.clone());
            }
        }
        out
    }
}

/// Catalog-side table statistics, keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationStats {
    pub row_count: f64,
    pub total_size_bytes: f64,
    pub column_stats: HashMap<String, ColumnStatistics>,
}

impl RelationStats {
    pub fn new(row_count: f64, total_size_bytes: f64) -> Self {
        Self {
            row_count,
            total_size_bytes,
            column_stats: HashMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, stats: ColumnStatistics) -> Self {
        self.column_stats.insert(name.into(), stats);
        self
    }
}

/// Per-column statistics used for selectivity estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Number of distinct values (NDV). Used for equality selectivity: sel = 1/NDV.
    pub distinct_count: f64,
    /// Fraction of rows that are NULL [0.0, 1.0].
    pub null_fraction: f64,
    pub min_value: Option<ScalarValue>,
    pub max_value: Option<ScalarValue>,
    /// Average size of a single value in bytes.
    pub avg_row_size: f64,
}

impl ColumnStatistics {
    pub fn new(distinct_count: f64, null_fraction: f64) -> Self {
        Self {
            distinct_count,
            null_fraction,
            min_value: None,
            max_value: None,
            avg_row_size: 8.0,
        }
    }

    /// A column holding the same value on every row.
    pub fn constant(value: &ScalarValue) -> Self {
        if value.is_null() {
            return Self::new(0.0, 1.0);
        }
        Self {
            distinct_count: 1.0,
            null_fraction: 0.0,
            min_value: Some(value.clone()),
            max_value: Some(value.clone()),
            avg_row_size: 8.0,
        }
    }
}

/// Bound `input` by `max_card`.
///
/// Returns `input` itself (same allocation) when its row count is within the
/// bound, otherwise a new object truncated to the bound.
pub fn bound_statistics(input: &Arc<Statistics>, max_card: MaxCard) -> Arc<Statistics> {
    let bound = max_card.as_f64();
    if input.row_count <= bound {
        return Arc::clone(input);
    }
    let ratio = if input.row_count > 0.0 {
        bound / input.row_count
    } else {
        1.0
    };
    let mut column_stats = input.column_stats.clone();
    for cs in column_stats.values_mut() {
        cs.distinct_count = cs.distinct_count.min(bound);
    }
    Arc::new(Statistics {
        row_count: bound,
        total_size_bytes: input.total_size_bytes * ratio,
        column_stats,
    })
}

/// The same statistics with column ids pushed through `mapping`; columns
/// without a mapping are dropped.
pub fn remap_statistics(input: &Statistics, mapping: &ColumnMapping) -> Statistics {
    Statistics {
        row_count: input.row_count,
        total_size_bytes: input.total_size_bytes,
        column_stats: input
            .column_stats
            .iter()
            .filter_map(|(col, cs)| mapping.get(col).map(|&to| (to, cs.clone())))
            .collect(),
    }
}

/// Derive statistics for join output.
///
/// Uses the standard cardinality estimation formula for equi-joins:
///
/// ```text
/// |A JOIN B| = |A| * |B| / max(NDV(A.key), NDV(B.key))
/// ```
///
/// For multi-column joins, selectivities are multiplied (independence assumption).
/// When NDV information is unavailable for a column, the relation's row count
/// is used as the NDV.
pub fn derive_join_stats(
    left: &Statistics,
    right: &Statistics,
    join_columns: &[(ColumnId, ColumnId)],
) -> Statistics {
    let mut selectivity = 1.0_f64;
    for (left_col, right_col) in join_columns {
        let left_ndv = left
            .column_stats
            .get(left_col)
            .map(|s| s.distinct_count)
            .unwrap_or(left.row_count);
        let right_ndv = right
            .column_stats
            .get(right_col)
            .map(|s| s.distinct_count)
            .unwrap_or(right.row_count);
        let max_ndv = left_ndv.max(right_ndv).max(1.0);
        selectivity /= max_ndv;
    }

    let row_count = (left.row_count * right.row_count * selectivity).max(1.0);
    combine_sides(left, right, row_count)
}

/// Derive statistics for left outer join output: the inner-join estimate, but
/// never fewer rows than the preserved side.
pub fn derive_left_outer_join_stats(
    left: &Statistics,
    right: &Statistics,
    join_columns: &[(ColumnId, ColumnId)],
) -> Statistics {
    let inner = derive_join_stats(left, right, join_columns);
    if inner.row_count >= left.row_count {
        return inner;
    }
    combine_sides(left, right, left.row_count)
}

fn combine_sides(left: &Statistics, right: &Statistics, row_count: f64) -> Statistics {
    let total_size_bytes =
        row_count * (left.avg_row_width(100.0) + right.avg_row_width(100.0));

    // NDV can't exceed the output row count.
    let mut column_stats = HashMap::new();
    for (col, stats) in left.column_stats.iter().chain(right.column_stats.iter()) {
        let mut cs = stats.clone();
        cs.distinct_count = cs.distinct_count.min(row_count);
        column_stats.insert(*col, cs);
    }

    Statistics {
        row_count,
        total_size_bytes,
        column_stats,
    }
}

/// Derive statistics for filter output.
///
/// Output rows = input rows * selectivity (floored at 1 unless the selectivity
/// is zero); size and column NDVs scale by the same ratio.
pub fn derive_filter_stats(input: &Statistics, selectivity: f64) -> Statistics {
    let row_count = if selectivity <= 0.0 {
        0.0
    } else {
        (input.row_count * selectivity).max(1.0).min(input.row_count)
    };
    let ratio = if input.row_count > 0.0 {
        row_count / input.row_count
    } else {
        1.0
    };

    let mut column_stats = HashMap::new();
    for (col, stats) in &input.column_stats {
        let mut cs = stats.clone();
        cs.distinct_count = (cs.distinct_count * ratio).max(1.0).min(row_count);
        column_stats.insert(*col, cs);
    }

    Statistics {
        row_count,
        total_size_bytes: input.total_size_bytes * ratio,
        column_stats,
    }
}

/// Derive statistics for aggregate output.
///
/// Output groups = product of grouping-column NDVs, capped by input rows. A
/// global aggregate (no grouping columns) produces one row.
pub fn derive_aggregate_stats(input: &Statistics, grouping: &[ColumnId], row_width: f64) -> Statistics {
    let mut row_count = 1.0_f64;
    for col in grouping {
        let ndv = input
            .column_stats
            .get(col)
            .map(|s| s.distinct_count)
            .unwrap_or(input.row_count);
        row_count *= ndv;
    }
    row_count = row_count.min(input.row_count).max(1.0);

    let mut column_stats = HashMap::new();
    for col in grouping {
        if let Some(cs) = input.column_stats.get(col) {
            let mut cs = cs.clone();
            cs.distinct_count = cs.distinct_count.min(row_count);
            column_stats.insert(*col, cs);
        }
    }

    Statistics {
        row_count,
        total_size_bytes: row_count * row_width,
        column_stats,
    }
}

/// Derive statistics for project output.
///
/// Column statistics of the input survive for columns still in `outputs`;
/// each column in `constants` is known to hold one value on every row.
pub fn derive_project_stats(
    input: &Statistics,
    outputs: &ColumnSet,
    constants: &HashMap<ColumnId, ScalarValue>,
) -> Statistics {
    let mut column_stats: HashMap<ColumnId, ColumnStatistics> = input
        .column_stats
        .iter()
        .filter(|(col, _)| outputs.contains(*col))
        .map(|(col, cs)| (*col, cs.clone()))
        .collect();
    for (col, value) in constants {
        column_stats.insert(*col, ColumnStatistics::constant(value));
    }
    let extra_width: f64 = constants.len() as f64 * 8.0;
    Statistics {
        row_count: input.row_count,
        total_size_bytes: input.total_size_bytes + input.row_count * extra_width,
        column_stats,
    }
}

/// Exact statistics of literal rows.
pub fn derive_const_table_stats(columns: &[ColumnId], rows: &[Vec<ScalarValue>]) -> Statistics {
    let row_count = rows.len() as f64;
    let mut out = Statistics::new(row_count, row_count * columns.len() as f64 * 8.0);
    for (i, &column) in columns.iter().enumerate() {
        let mut distinct: Vec<&ScalarValue> = Vec::new();
        let mut nulls = 0usize;
        let mut min: Option<&ScalarValue> = None;
        let mut max: Option<&ScalarValue> = None;
        for value in rows.iter().filter_map(|row| row.get(i)) {
            if value.is_null() {
                nulls += 1;
                continue;
            }
            if !distinct.contains(&value) {
                distinct.push(value);
            }
            if min.map_or(true, |m| value.compare(m) == Some(Ordering::Less)) {
                min = Some(value);
            }
            if max.map_or(true, |m| value.compare(m) == Some(Ordering::Greater)) {
                max = Some(value);
            }
        }
        let null_fraction = if rows.is_empty() {
            0.0
        } else {
            nulls as f64 / row_count
        };
        let mut cs = ColumnStatistics::new(distinct.len() as f64, null_fraction);
        cs.min_value = min.cloned();
        cs.max_value = max.cloned();
        out.column_stats.insert(column, cs);
    }
    out
}

/// Estimate selectivity for an equality predicate: `sel = 1 / NDV`.
pub fn equality_selectivity(stats: &Statistics, column: ColumnId) -> f64 {
    stats
        .column_stats
        .get(&column)
        .map(|cs| 1.0 / cs.distinct_count.max(1.0))
        .unwrap_or(DEFAULT_FILTER_SELECTIVITY)
}

/// Estimate the selectivity of a predicate expression.
///
/// - **Equality (col = value)**: 1 / NDV(col), falling back to 0.1.
/// - **Range**: fixed 1/3.
/// - **AND**: product of the conjuncts (independence assumption).
/// - **OR**: inclusion-exclusion, sel(A OR B) = 1 - (1 - sel(A)) * (1 - sel(B)).
/// - **NOT**: complement.
/// - **IS [NOT] NULL**: the column's null fraction or its complement.
/// - **Literal TRUE**: 1; literal FALSE or NULL: 0.
/// - **Unknown predicates**: the default selectivity of 0.1.
pub fn estimate_selectivity(predicate: &ExprNode, stats: &Statistics) -> f64 {
    let children = predicate.children();
    let op = match predicate.op() {
        Operator::Scalar(op) => op,
        Operator::Logical(_) => return DEFAULT_FILTER_SELECTIVITY,
    };
    match op {
        ScalarOp::Const { value, .. } => match value {
            ScalarValue::Bool(true) => 1.0,
            ScalarValue::Bool(false) | ScalarValue::Null => 0.0,
            _ => DEFAULT_FILTER_SELECTIVITY,
        },
        ScalarOp::Cmp { op } => {
            let column = children.iter().find_map(|c| match c.op() {
                Operator::Scalar(ScalarOp::Ident { column }) => Some(*column),
                _ => None,
            });
            match (op, column) {
                (CmpOp::Eq, Some(column)) => equality_selectivity(stats, column),
                (CmpOp::NotEq, Some(column)) => 1.0 - equality_selectivity(stats, column),
                (CmpOp::Lt | CmpOp::LtEq | CmpOp::Gt | CmpOp::GtEq, _) => RANGE_SELECTIVITY,
                _ => DEFAULT_FILTER_SELECTIVITY,
            }
        }
        ScalarOp::BoolExpr { op: BoolOp::And } => children
            .iter()
            .map(|c| estimate_selectivity(c, stats))
            .product(),
        ScalarOp::BoolExpr { op: BoolOp::Or } => {
            let product: f64 = children
                .iter()
                .map(|c| 1.0 - estimate_selectivity(c, stats))
                .product();
            1.0 - product
        }
        ScalarOp::BoolExpr { op: BoolOp::Not } => children
            .first()
            .map_or(DEFAULT_FILTER_SELECTIVITY, |c| 1.0 - estimate_selectivity(c, stats)),
        ScalarOp::NullTest { negated } => {
            let null_fraction = children.first().and_then(|c| match c.op() {
                Operator::Scalar(ScalarOp::Ident { column }) => {
                    stats.column_stats.get(column).map(|cs| cs.null_fraction)
                }
                _ => None,
            });
            match (null_fraction, negated) {
                (Some(f), false) => f,
                (Some(f), true) => 1.0 - f,
                (None, _) => DEFAULT_FILTER_SELECTIVITY,
            }
        }
        _ => DEFAULT_FILTER_SELECTIVITY,
    }
}

/// Equi-join column pairs of a join predicate, e.g. `a = x AND b = y` gives
/// `[(a, x), (b, y)]`.
pub fn equi_join_columns(predicate: &ExprNode) -> Vec<(ColumnId, ColumnId)> {
    let mut pairs = Vec::new();
    collect_equi_join_columns(predicate, &mut pairs);
    pairs
}

fn collect_equi_join_columns(expr: &ExprNode, pairs: &mut Vec<(ColumnId, ColumnId)>) {
    match expr.op() {
        Operator::Scalar(ScalarOp::Cmp { op: CmpOp::Eq }) => {
            if let [l, r] = expr.children() {
                if let (
                    Operator::Scalar(ScalarOp::Ident { column: lc }),
                    Operator::Scalar(ScalarOp::Ident { column: rc }),
                ) = (l.op(), r.op())
                {
                    pairs.push((*lc, *rc));
                }
            }
        }
        Operator::Scalar(ScalarOp::BoolExpr { op: BoolOp::And }) => {
            for c in expr.children() {
                collect_equi_join_columns(c, pairs);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(i: u32) -> ColumnId {
        ColumnId(i)
    }

    #[test]
    fn test_bound_statistics_identity_within_bound() {
        let input = Arc::new(Statistics::new(5.0, 500.0));
        let bounded = bound_statistics(&input, MaxCard::bounded(10));
        assert!(Arc::ptr_eq(&input, &bounded));
        let unbounded = bound_statistics(&input, MaxCard::unbounded());
        assert!(Arc::ptr_eq(&input, &unbounded));
    }

    #[test]
    fn test_bound_statistics_truncates_copy() {
        let input = Arc::new(
            Statistics::new(1_000_000.0, 100_000_000.0)
                .with_column(col(1), ColumnStatistics::new(50_000.0, 0.0)),
        );
        let bounded = bound_statistics(&input, MaxCard::bounded(10));
        assert!(!Arc::ptr_eq(&input, &bounded));
        assert_eq!(bounded.row_count, 10.0);
        assert_eq!(bounded.total_size_bytes, 1000.0);
        assert_eq!(bounded.column_stats[&col(1)].distinct_count, 10.0);
        assert_eq!(input.row_count, 1_000_000.0);
    }

    #[test]
    fn test_join_stats_uses_max_ndv() {
        let left = Statistics::new(1000.0, 100_000.0)
            .with_column(col(1), ColumnStatistics::new(100.0, 0.0));
        let right = Statistics::new(500.0, 50_000.0)
            .with_column(col(2), ColumnStatistics::new(250.0, 0.0));
        let joined = derive_join_stats(&left, &right, &[(col(1), col(2))]);
        assert_eq!(joined.row_count, 2000.0);
        assert_eq!(joined.total_size_bytes, 2000.0 * 200.0);
    }

    #[test]
    fn test_left_outer_join_keeps_left_rows() {
        let left = Statistics::new(1000.0, 100_000.0)
            .with_column(col(1), ColumnStatistics::new(1000.0, 0.0));
        let right = Statistics::new(10.0, 1000.0)
            .with_column(col(2), ColumnStatistics::new(10.0, 0.0));
        let joined = derive_left_outer_join_stats(&left, &right, &[(col(1), col(2))]);
        assert_eq!(joined.row_count, 1000.0);
    }

    #[test]
    fn test_aggregate_stats_capped_by_input() {
        let input = Statistics::new(100.0, 10_000.0)
            .with_column(col(1), ColumnStatistics::new(20.0, 0.0))
            .with_column(col(2), ColumnStatistics::new(20.0, 0.0));
        assert_eq!(derive_aggregate_stats(&input, &[col(1)], 100.0).row_count, 20.0);
        assert_eq!(derive_aggregate_stats(&input, &[col(1), col(2)], 100.0).row_count, 100.0);
        assert_eq!(derive_aggregate_stats(&input, &[], 100.0).row_count, 1.0);
    }

    #[test]
    fn test_filter_stats_scale_ndv() {
        let input = Statistics::new(1000.0, 100_000.0)
            .with_column(col(1), ColumnStatistics::new(500.0, 0.0));
        let filtered = derive_filter_stats(&input, DEFAULT_FILTER_SELECTIVITY);
        assert_eq!(filtered.row_count, 100.0);
        assert_eq!(filtered.column_stats[&col(1)].distinct_count, 50.0);
        assert_eq!(derive_filter_stats(&input, 0.0).row_count, 0.0);
    }

    #[test]
    fn test_project_stats_record_constants() {
        let input = Statistics::new(100.0, 1000.0)
            .with_column(col(1), ColumnStatistics::new(10.0, 0.0))
            .with_column(col(2), ColumnStatistics::new(10.0, 0.0));
        let outputs: ColumnSet = [col(1), col(3)].into_iter().collect();
        let constants: HashMap<ColumnId, ScalarValue> =
            [(col(3), ScalarValue::Int32(5))].into_iter().collect();
        let projected = derive_project_stats(&input, &outputs, &constants);
        assert_eq!(projected.row_count, 100.0);
        assert!(!projected.column_stats.contains_key(&col(2)));
        let c = &projected.column_stats[&col(3)];
        assert_eq!(c.distinct_count, 1.0);
        assert_eq!(c.min_value, Some(ScalarValue::Int32(5)));
    }

    #[test]
    fn test_const_table_stats_are_exact() {
        let rows = vec![
            vec![ScalarValue::Int64(3)],
            vec![ScalarValue::Int64(1)],
            vec![ScalarValue::Int64(3)],
            vec![ScalarValue::Null],
        ];
        let stats = derive_const_table_stats(&[col(1)], &rows);
        assert_eq!(stats.row_count, 4.0);
        let cs = &stats.column_stats[&col(1)];
        assert_eq!(cs.distinct_count, 2.0);
        assert_eq!(cs.null_fraction, 0.25);
        assert_eq!(cs.min_value, Some(ScalarValue::Int64(1)));
        assert_eq!(cs.max_value, Some(ScalarValue::Int64(3)));
    }
}
