//! # Constraint and Equivalence Engine
//!
//! Two kinds of facts describe the values a relation can hold:
//!
//! - **Constraints**: per-column intervals. An interval is a list of ranges plus
//!   an includes-null flag. No ranges and no null means no row can satisfy it;
//!   no ranges with the null flag is the "is null" marker.
//! - **Equivalence classes**: a partition of columns known to be pairwise equal.
//!
//! [`PropConstraint`] bundles both and is what relational properties carry.
//!
//! ## Merging
//!
//! Conjoining constraints flattens nested conjunctions and intersects intervals
//! on the same column. Merging equivalence classes computes the coarsest
//! partition in which every input class is contained: classes sharing a column
//! are unioned until no two classes overlap, with a union-find over columns.
//!
//! ## Sources
//!
//! Facts enter through [`from_predicate`] (Select and join predicates) and
//! [`project_constraint`] (project elements that bind a literal or rename a
//! column). Everything else passes its children's facts through, restricts them
//! (GbAgg) or remaps them (CTE consumers).

use crate::column::{ColumnId, ColumnMapping, ColumnRegistry, ColumnSet};
use crate::error::{OptError, Result};
use crate::expr::{BoolOp, CmpOp, Operator, ScalarOp, ScalarValue};
use crate::node::ExprNode;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

/// A contiguous range of non-null values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub lower: Bound<ScalarValue>,
    pub upper: Bound<ScalarValue>,
}

fn bound_value(bound: &Bound<ScalarValue>) -> Option<&ScalarValue> {
    match bound {
        Bound::Included(v) | Bound::Excluded(v) => Some(v),
        Bound::Unbounded => None,
    }
}

/// The more restrictive of two bounds; `None` if the values don't compare.
fn tighter(
    a: &Bound<ScalarValue>,
    b: &Bound<ScalarValue>,
    prefer_greater: bool,
) -> Option<Bound<ScalarValue>> {
    let (av, bv) = match (bound_value(a), bound_value(b)) {
        (None, _) => return Some(b.clone()),
        (_, None) => return Some(a.clone()),
        (Some(av), Some(bv)) => (av, bv),
    };
    let winner = match (av.compare(bv)?, prefer_greater) {
        (Ordering::Greater, true) | (Ordering::Less, false) => a,
        (Ordering::Less, true) | (Ordering::Greater, false) => b,
        (Ordering::Equal, _) if matches!(a, Bound::Excluded(_)) => a,
        (Ordering::Equal, _) => b,
    };
    Some(winner.clone())
}

impl Range {
    pub fn unbounded() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    pub fn point(value: ScalarValue) -> Self {
        Self {
            lower: Bound::Included(value.clone()),
            upper: Bound::Included(value),
        }
    }

    /// Ranges of the values `v` satisfying `v <op> value`.
    pub fn from_cmp(op: CmpOp, value: ScalarValue) -> Vec<Range> {
        let range = |lower, upper| Range { lower, upper };
        match op {
            CmpOp::Eq => vec![Range::point(value)],
            CmpOp::NotEq => vec![
                range(Bound::Unbounded, Bound::Excluded(value.clone())),
                range(Bound::Excluded(value), Bound::Unbounded),
            ],
            CmpOp::Lt => vec![range(Bound::Unbounded, Bound::Excluded(value))],
            CmpOp::LtEq => vec![range(Bound::Unbounded, Bound::Included(value))],
            CmpOp::Gt => vec![range(Bound::Excluded(value), Bound::Unbounded)],
            CmpOp::GtEq => vec![range(Bound::Included(value), Bound::Unbounded)],
        }
    }

    pub fn point_value(&self) -> Option<&ScalarValue> {
        match (&self.lower, &self.upper) {
            (Bound::Included(l), Bound::Included(u)) if l == u => Some(l),
            _ => None,
        }
    }

    /// Whether the range contains no value; `None` if the bounds don't compare.
    fn is_empty(&self) -> Option<bool> {
        let (l, u) = match (bound_value(&self.lower), bound_value(&self.upper)) {
            (Some(l), Some(u)) => (l, u),
            _ => return Some(false),
        };
        Some(match l.compare(u)? {
            Ordering::Less => false,
            Ordering::Greater => true,
            Ordering::Equal => !matches!(
                (&self.lower, &self.upper),
                (Bound::Included(_), Bound::Included(_))
            ),
        })
    }

    /// Outer `None`: incomparable values. Inner `None`: empty intersection.
    fn intersect(&self, other: &Range) -> Option<Option<Range>> {
        let range = Range {
            lower: tighter(&self.lower, &other.lower, true)?,
            upper: tighter(&self.upper, &other.upper, false)?,
        };
        if range.is_empty()? {
            Some(None)
        } else {
            Some(Some(range))
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lower {
            Bound::Included(v) => write!(f, "[{}", v)?,
            Bound::Excluded(v) => write!(f, "({}", v)?,
            Bound::Unbounded => write!(f, "(-inf")?,
        }
        match &self.upper {
            Bound::Included(v) => write!(f, ", {}]", v),
            Bound::Excluded(v) => write!(f, ", {})", v),
            Bound::Unbounded => write!(f, ", +inf)"),
        }
    }
}

/// The values one column may take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintInterval {
    pub column: ColumnId,
    pub ranges: Vec<Range>,
    pub includes_null: bool,
}

impl ConstraintInterval {
    pub fn new(column: ColumnId, ranges: Vec<Range>, includes_null: bool) -> Self {
        Self {
            column,
            ranges,
            includes_null,
        }
    }

    /// `{column = value}`, or the is-null marker for a NULL literal.
    pub fn point(column: ColumnId, value: ScalarValue) -> Self {
        if value.is_null() {
            Self::is_null(column)
        } else {
            Self::new(column, vec![Range::point(value)], false)
        }
    }

    pub fn is_null(column: ColumnId) -> Self {
        Self::new(column, Vec::new(), true)
    }

    pub fn not_null(column: ColumnId) -> Self {
        Self::new(column, vec![Range::unbounded()], false)
    }

    pub fn contradiction(column: ColumnId) -> Self {
        Self::new(column, Vec::new(), false)
    }

    /// Values satisfying `column <op> value`. Comparing with NULL is never true.
    pub fn from_cmp(column: ColumnId, op: CmpOp, value: ScalarValue) -> Self {
        if value.is_null() {
            Self::contradiction(column)
        } else {
            Self::new(column, Range::from_cmp(op, value), false)
        }
    }

    pub fn is_contradiction(&self) -> bool {
        self.ranges.is_empty() && !self.includes_null
    }

    pub fn is_null_marker(&self) -> bool {
        self.ranges.is_empty() && self.includes_null
    }

    /// The single value this interval allows, if it is a non-null point.
    pub fn point_value(&self) -> Option<&ScalarValue> {
        match self.ranges.as_slice() {
            [range] if !self.includes_null => range.point_value(),
            _ => None,
        }
    }

    /// Intersection of two intervals on the same column, `None` when their
    /// values cannot be compared.
    pub fn intersect(&self, other: &ConstraintInterval) -> Option<ConstraintInterval> {
        let mut ranges = Vec::new();
        for a in &self.ranges {
            for b in &other.ranges {
                if let Some(range) = a.intersect(b)? {
                    if !ranges.contains(&range) {
                        ranges.push(range);
                    }
                }
            }
        }
        Some(Self::new(
            self.column,
            ranges,
            self.includes_null && other.includes_null,
        ))
    }

    pub fn union(&self, other: &ConstraintInterval) -> ConstraintInterval {
        let mut ranges = self.ranges.clone();
        for range in &other.ranges {
            if !ranges.contains(range) {
                ranges.push(range.clone());
            }
        }
        Self::new(
            self.column,
            ranges,
            self.includes_null || other.includes_null,
        )
    }
}

impl fmt::Display for ConstraintInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {{", self.column)?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", range)?;
        }
        if self.includes_null {
            if !self.ranges.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "NULL")?;
        }
        write!(f, "}}")
    }
}

/// A constraint over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    Interval(ConstraintInterval),
    Conjunction(Vec<Constraint>),
}

impl Constraint {
    /// Conjoin `parts`, flattening nested conjunctions and intersecting
    /// intervals on the same column. `None` if nothing remains.
    pub fn conjunction(parts: impl IntoIterator<Item = Constraint>) -> Option<Constraint> {
        let mut flat = Vec::new();
        for part in parts {
            part.flatten_into(&mut flat);
        }
        let mut merged: Vec<ConstraintInterval> = Vec::with_capacity(flat.len());
        for interval in flat {
            let combined = merged
                .iter_mut()
                .filter(|existing| existing.column == interval.column)
                .find_map(|existing| existing.intersect(&interval).map(|both| (existing, both)));
            match combined {
                Some((existing, both)) => *existing = both,
                None => merged.push(interval),
            }
        }
        match merged.len() {
            0 => None,
            1 => merged.pop().map(Constraint::Interval),
            _ => Some(Constraint::Conjunction(
                merged.into_iter().map(Constraint::Interval).collect(),
            )),
        }
    }

    fn flatten_into(self, out: &mut Vec<ConstraintInterval>) {
        match self {
            Constraint::Interval(interval) => out.push(interval),
            Constraint::Conjunction(parts) => {
                for part in parts {
                    part.flatten_into(out);
                }
            }
        }
    }

    pub fn intervals(&self) -> Vec<&ConstraintInterval> {
        match self {
            Constraint::Interval(interval) => vec![interval],
            Constraint::Conjunction(parts) => parts.iter().flat_map(|p| p.intervals()).collect(),
        }
    }

    pub fn interval_for(&self, column: ColumnId) -> Option<&ConstraintInterval> {
        self.intervals().into_iter().find(|i| i.column == column)
    }

    pub fn columns(&self) -> ColumnSet {
        self.intervals().iter().map(|i| i.column).collect()
    }

    /// No row can satisfy the constraint.
    pub fn is_contradiction(&self) -> bool {
        self.intervals().iter().any(|i| i.is_contradiction())
    }

    /// The part of the constraint that only mentions `columns`.
    pub fn restrict(&self, columns: &ColumnSet) -> Option<Constraint> {
        Constraint::conjunction(
            self.intervals()
                .into_iter()
                .filter(|i| columns.contains(&i.column))
                .map(|i| Constraint::Interval(i.clone())),
        )
    }

    /// Substitute columns through `mapping`, dropping intervals on unmapped
    /// columns.
    pub fn remap(&self, mapping: &ColumnMapping) -> Option<Constraint> {
        Constraint::conjunction(self.intervals().into_iter().filter_map(|i| {
            mapping.get(&i.column).map(|&column| {
                Constraint::Interval(ConstraintInterval {
                    column,
                    ..i.clone()
                })
            })
        }))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, interval) in self.intervals().into_iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", interval)?;
        }
        Ok(())
    }
}

/// Union-find over column ids with path halving.
#[derive(Default)]
struct UnionFind {
    parent: BTreeMap<ColumnId, ColumnId>,
}

impl UnionFind {
    fn find(&mut self, column: ColumnId) -> ColumnId {
        let mut x = column;
        loop {
            let parent = *self.parent.entry(x).or_insert(x);
            if parent == x {
                return x;
            }
            let grandparent = *self.parent.entry(parent).or_insert(parent);
            self.parent.insert(x, grandparent);
            x = grandparent;
        }
    }

    fn union(&mut self, a: ColumnId, b: ColumnId) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent.insert(ra.max(rb), ra.min(rb));
        }
    }

    fn into_classes(mut self) -> Vec<ColumnSet> {
        let columns: Vec<ColumnId> = self.parent.keys().copied().collect();
        let mut classes: BTreeMap<ColumnId, ColumnSet> = BTreeMap::new();
        for column in columns {
            let root = self.find(column);
            classes.entry(root).or_default().insert(column);
        }
        let mut classes: Vec<ColumnSet> = classes.into_values().collect();
        classes.sort();
        classes
    }
}

/// Disjoint classes of columns known to be pairwise equal.
///
/// One-element classes are kept: a column bound to a literal is recorded as
/// its own class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EquivalenceClasses {
    classes: Vec<ColumnSet>,
}

impl EquivalenceClasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_classes(classes: impl IntoIterator<Item = ColumnSet>) -> Self {
        let classes: Vec<ColumnSet> = classes.into_iter().collect();
        Self::close(classes.iter())
    }

    fn close<'a>(classes: impl Iterator<Item = &'a ColumnSet>) -> Self {
        let mut uf = UnionFind::default();
        for class in classes {
            let mut members = class.iter();
            if let Some(&first) = members.next() {
                uf.find(first);
                for &other in members {
                    uf.union(first, other);
                }
            }
        }
        Self {
            classes: uf.into_classes(),
        }
    }

    /// Coarsest partition containing every class of `self` and `other`.
    pub fn merge(&self, other: &EquivalenceClasses) -> EquivalenceClasses {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        Self::close(self.classes.iter().chain(other.classes.iter()))
    }

    pub fn classes(&self) -> &[ColumnSet] {
        &self.classes
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_of(&self, column: ColumnId) -> Option<&ColumnSet> {
        self.classes.iter().find(|c| c.contains(&column))
    }

    pub fn are_equivalent(&self, a: ColumnId, b: ColumnId) -> bool {
        a == b || self.class_of(a).is_some_and(|c| c.contains(&b))
    }

    /// Classes intersected with `columns`; empty classes disappear.
    pub fn restrict(&self, columns: &ColumnSet) -> EquivalenceClasses {
        Self {
            classes: self
                .classes
                .iter()
                .map(|c| c.intersection(columns).copied().collect::<ColumnSet>())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// Substitute columns through `mapping`, dropping unmapped columns.
    pub fn remap(&self, mapping: &ColumnMapping) -> EquivalenceClasses {
        Self::from_classes(self.classes.iter().map(|c| {
            c.iter()
                .filter_map(|col| mapping.get(col).copied())
                .collect::<ColumnSet>()
        }))
    }
}

/// Constraint facts attached to relational properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropConstraint {
    pub equivalence: EquivalenceClasses,
    pub constraint: Option<Constraint>,
}

impl PropConstraint {
    pub fn new(equivalence: EquivalenceClasses, constraint: Option<Constraint>) -> Self {
        Self {
            equivalence,
            constraint,
        }
    }

    pub fn from_interval(interval: ConstraintInterval) -> Self {
        Self::new(
            EquivalenceClasses::new(),
            Some(Constraint::Interval(interval)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.equivalence.is_empty() && self.constraint.is_none()
    }

    pub fn is_contradiction(&self) -> bool {
        self.constraint
            .as_ref()
            .is_some_and(Constraint::is_contradiction)
    }

    pub fn conjoin(&self, other: &PropConstraint) -> PropConstraint {
        PropConstraint {
            equivalence: self.equivalence.merge(&other.equivalence),
            constraint: Constraint::conjunction(
                self.constraint
                    .iter()
                    .chain(other.constraint.iter())
                    .cloned(),
            ),
        }
    }

    pub fn restrict(&self, columns: &ColumnSet) -> PropConstraint {
        PropConstraint {
            equivalence: self.equivalence.restrict(columns),
            constraint: self.constraint.as_ref().and_then(|c| c.restrict(columns)),
        }
    }

    pub fn remap(&self, mapping: &ColumnMapping) -> PropConstraint {
        PropConstraint {
            equivalence: self.equivalence.remap(mapping),
            constraint: self.constraint.as_ref().and_then(|c| c.remap(mapping)),
        }
    }
}

fn ident_column(node: &ExprNode) -> Option<ColumnId> {
    match node.op() {
        Operator::Scalar(ScalarOp::Ident { column }) => Some(*column),
        _ => None,
    }
}

fn literal(node: &ExprNode) -> Option<&ScalarValue> {
    match node.op() {
        Operator::Scalar(ScalarOp::Const { value, .. }) => Some(value),
        _ => None,
    }
}

fn constrainable(registry: &ColumnRegistry, column: ColumnId) -> Result<bool> {
    Ok(registry.lookup(column)?.data_type.is_constrainable())
}

/// Facts implied by a predicate holding on every output row.
///
/// Understands conjunctions, `column <op> literal` in either order,
/// `column = column`, null tests, and disjunctions of intervals on one column.
/// Anything else contributes nothing.
pub fn from_predicate(predicate: &ExprNode, registry: &ColumnRegistry) -> Result<PropConstraint> {
    let op = match predicate.op() {
        Operator::Scalar(op) => op,
        Operator::Logical(_) => {
            return Err(OptError::invariant("predicate child is a relational operator"))
        }
    };
    let children = predicate.children();
    match op {
        ScalarOp::BoolExpr { op: BoolOp::And } => {
            let mut acc = PropConstraint::default();
            for child in children {
                acc = acc.conjoin(&from_predicate(child, registry)?);
            }
            Ok(acc)
        }
        ScalarOp::BoolExpr { op: BoolOp::Or } => {
            let mut union: Option<ConstraintInterval> = None;
            for child in children {
                let derived = from_predicate(child, registry)?;
                let single = match (&derived.constraint, derived.equivalence.is_empty()) {
                    (Some(Constraint::Interval(i)), true) => i.clone(),
                    _ => return Ok(PropConstraint::default()),
                };
                union = Some(match union {
                    None => single,
                    Some(acc) if acc.column == single.column => acc.union(&single),
                    Some(_) => return Ok(PropConstraint::default()),
                });
            }
            Ok(PropConstraint::new(
                EquivalenceClasses::new(),
                union.map(Constraint::Interval),
            ))
        }
        ScalarOp::Cmp { op } if children.len() == 2 => {
            let (left, right) = (&children[0], &children[1]);
            if let (Some(a), Some(b)) = (ident_column(left), ident_column(right)) {
                if *op == CmpOp::Eq && a != b {
                    let class: ColumnSet = [a, b].into_iter().collect();
                    return Ok(PropConstraint::new(
                        EquivalenceClasses::from_classes([class]),
                        None,
                    ));
                }
                return Ok(PropConstraint::default());
            }
            let (column, op, value) = match (ident_column(left), literal(right)) {
                (Some(c), Some(v)) => (c, *op, v),
                _ => match (ident_column(right), literal(left)) {
                    (Some(c), Some(v)) => (c, op.commute(), v),
                    _ => return Ok(PropConstraint::default()),
                },
            };
            if !constrainable(registry, column)? {
                return Ok(PropConstraint::default());
            }
            Ok(PropConstraint::from_interval(ConstraintInterval::from_cmp(
                column,
                op,
                value.clone(),
            )))
        }
        ScalarOp::NullTest { negated } => {
            let column = match children.first().and_then(|c| ident_column(c)) {
                Some(column) if constrainable(registry, column)? => column,
                _ => return Ok(PropConstraint::default()),
            };
            let interval = if *negated {
                ConstraintInterval::not_null(column)
            } else {
                ConstraintInterval::is_null(column)
            };
            Ok(PropConstraint::from_interval(interval))
        }
        _ => Ok(PropConstraint::default()),
    }
}

/// Constraint of a Project given its child's facts and its project list.
///
/// A project list containing a subquery passes the child's facts through
/// unchanged. Otherwise each element binding a constrainable column to a
/// literal contributes a point (or is-null) interval and a one-column class,
/// and each element renaming a non-nullable base-table column of the same type
/// contributes the class `{new, source}`. Local classes are merged into the
/// child's, local intervals are conjoined ahead of the child's constraint.
pub fn project_constraint(
    child: &PropConstraint,
    project_list: &ExprNode,
    has_subquery: bool,
    registry: &ColumnRegistry,
) -> Result<PropConstraint> {
    if has_subquery {
        return Ok(child.clone());
    }

    let mut classes: Vec<ColumnSet> = Vec::new();
    let mut intervals: Vec<Constraint> = Vec::new();
    for element in project_list.children() {
        let column = match element.op() {
            Operator::Scalar(ScalarOp::ProjectElement { column }) => *column,
            other => {
                return Err(OptError::unsupported(format!(
                    "project list entry {} is not a project element",
                    other
                )))
            }
        };
        let defined = registry.lookup(column)?;
        if !defined.data_type.is_constrainable() {
            continue;
        }
        let Some(value_expr) = element.children().first() else {
            continue;
        };
        match value_expr.op() {
            Operator::Scalar(ScalarOp::Const { value, .. }) => {
                intervals.push(Constraint::Interval(ConstraintInterval::point(
                    column,
                    value.clone(),
                )));
                classes.push([column].into_iter().collect());
            }
            Operator::Scalar(ScalarOp::Ident { column: source }) => {
                let source_desc = registry.lookup(*source)?;
                if source_desc.data_type == defined.data_type
                    && !source_desc.nullable
                    && source_desc.is_base_table_column()
                {
                    classes.push([column, *source].into_iter().collect());
                }
            }
            _ => {}
        }
    }

    if classes.is_empty() && intervals.is_empty() {
        return Ok(child.clone());
    }

    let equivalence = child
        .equivalence
        .merge(&EquivalenceClasses::from_classes(classes));
    intervals.extend(child.constraint.iter().cloned());
    Ok(PropConstraint::new(
        equivalence,
        Constraint::conjunction(intervals),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(i: u32) -> ColumnId {
        ColumnId(i)
    }

    fn set(ids: &[u32]) -> ColumnSet {
        ids.iter().map(|&i| ColumnId(i)).collect()
    }

    #[test]
    fn test_equivalence_merge_is_transitive() {
        let left = EquivalenceClasses::from_classes([set(&[1, 2]), set(&[3, 4]), set(&[9])]);
        let right = EquivalenceClasses::from_classes([set(&[2, 3]), set(&[5, 6])]);
        let merged = left.merge(&right);
        assert_eq!(
            merged.classes(),
            &[set(&[1, 2, 3, 4]), set(&[5, 6]), set(&[9])]
        );
        assert!(merged.are_equivalent(col(1), col(4)));
        assert!(!merged.are_equivalent(col(1), col(5)));
    }

    #[test]
    fn test_equivalence_merge_chain_needs_fixed_point() {
        // {1,2} {3,4} {5,6} joined only through the last class.
        let merged = EquivalenceClasses::from_classes([set(&[1, 2]), set(&[3, 4]), set(&[5, 6])])
            .merge(&EquivalenceClasses::from_classes([set(&[2, 5]), set(&[6, 3])]));
        assert_eq!(merged.classes(), &[set(&[1, 2, 3, 4, 5, 6])]);
    }

    #[test]
    fn test_equivalence_restrict_and_remap() {
        let classes = EquivalenceClasses::from_classes([set(&[1, 2, 3])]);
        assert_eq!(classes.restrict(&set(&[2, 3, 7])).classes(), &[set(&[2, 3])]);
        let mapping: ColumnMapping = [(col(1), col(11)), (col(2), col(12))].into_iter().collect();
        assert_eq!(classes.remap(&mapping).classes(), &[set(&[11, 12])]);
    }

    #[test]
    fn test_conjunction_intersects_same_column() {
        let gt = Constraint::Interval(ConstraintInterval::from_cmp(
            col(1),
            CmpOp::Gt,
            ScalarValue::Int64(3),
        ));
        let lt = Constraint::Interval(ConstraintInterval::from_cmp(
            col(1),
            CmpOp::Lt,
            ScalarValue::Int64(5),
        ));
        let other = Constraint::Interval(ConstraintInterval::not_null(col(2)));
        let conj = Constraint::conjunction([gt, Constraint::Conjunction(vec![lt, other])]).unwrap();
        assert_eq!(conj.intervals().len(), 2);
        let interval = conj.interval_for(col(1)).unwrap();
        assert_eq!(
            interval.ranges,
            vec![Range {
                lower: Bound::Excluded(ScalarValue::Int64(3)),
                upper: Bound::Excluded(ScalarValue::Int64(5)),
            }]
        );
        assert!(!conj.is_contradiction());
    }

    #[test]
    fn test_disjoint_points_contradict() {
        let five = Constraint::Interval(ConstraintInterval::point(col(1), ScalarValue::Int32(5)));
        let six = Constraint::Interval(ConstraintInterval::point(col(1), ScalarValue::Int32(6)));
        let conj = Constraint::conjunction([five, six]).unwrap();
        assert!(conj.is_contradiction());
    }

    #[test]
    fn test_half_open_bounds_meeting_are_empty() {
        let lt = ConstraintInterval::from_cmp(col(1), CmpOp::Lt, ScalarValue::Int64(5));
        let ge = ConstraintInterval::from_cmp(col(1), CmpOp::GtEq, ScalarValue::Int64(5));
        let le = ConstraintInterval::from_cmp(col(1), CmpOp::LtEq, ScalarValue::Int64(5));
        assert!(lt.intersect(&ge).unwrap().is_contradiction());
        assert_eq!(
            le.intersect(&ge).unwrap().point_value(),
            Some(&ScalarValue::Int64(5))
        );
    }

    #[test]
    fn test_incomparable_intervals_are_kept_apart() {
        let num = Constraint::Interval(ConstraintInterval::point(col(1), ScalarValue::Int64(1)));
        let text = Constraint::Interval(ConstraintInterval::point(
            col(1),
            ScalarValue::Utf8("x".into()),
        ));
        let conj = Constraint::conjunction([num, text]).unwrap();
        assert_eq!(conj.intervals().len(), 2);
    }

    #[test]
    fn test_null_point_is_null_marker() {
        let interval = ConstraintInterval::point(col(3), ScalarValue::Null);
        assert!(interval.is_null_marker());
        assert!(interval.ranges.is_empty());
        assert!(!interval.is_contradiction());
        assert!(ConstraintInterval::from_cmp(col(3), CmpOp::Eq, ScalarValue::Null).is_contradiction());
    }

    #[test]
    fn test_not_equal_splits_into_two_ranges() {
        let interval = ConstraintInterval::from_cmp(col(1), CmpOp::NotEq, ScalarValue::Int64(0));
        assert_eq!(interval.ranges.len(), 2);
        assert!(!interval.includes_null);
        assert_eq!(format!("{}", interval), "#1 in {(-inf, 0), (0, +inf)}");
    }

    #[test]
    fn test_prop_constraint_remap_drops_unmapped() {
        let props = PropConstraint::new(
            EquivalenceClasses::from_classes([set(&[1, 2])]),
            Constraint::conjunction([
                Constraint::Interval(ConstraintInterval::not_null(col(1))),
                Constraint::Interval(ConstraintInterval::not_null(col(2))),
            ]),
        );
        let mapping: ColumnMapping = [(col(1), col(10))].into_iter().collect();
        let remapped = props.remap(&mapping);
        assert_eq!(remapped.equivalence.classes(), &[set(&[10])]);
        assert_eq!(remapped.constraint.unwrap().columns(), set(&[10]));
    }
}
