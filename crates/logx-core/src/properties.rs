//! # Derived Properties
//!
//! Derived properties are facts about a subtree computed bottom-up once per node
//! and cached on it. Search and costing read them instead of re-walking the
//! subtree.
//!
//! ## Relational Properties
//!
//! Attached to logical operators: output columns, outer references (columns
//! used but not produced inside the subtree), a max-cardinality bound, candidate
//! keys, value constraints and statistics.
//!
//! ## Scalar Properties
//!
//! Attached to scalar subtrees: used and defined columns, plus two flags that
//! make derivation of the enclosing operator degrade (subqueries, set-returning
//! functions).

use crate::column::{ColumnMapping, ColumnSet};
use crate::constraint::PropConstraint;
use crate::stats::Statistics;
use std::fmt;
use std::sync::Arc;

/// Sound upper bound on the number of rows a subtree can produce.
/// `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaxCard(Option<u64>);

impl MaxCard {
    pub fn unbounded() -> Self {
        Self(None)
    }

    pub fn bounded(rows: u64) -> Self {
        Self(Some(rows))
    }

    pub fn zero() -> Self {
        Self(Some(0))
    }

    pub fn is_unbounded(&self) -> bool {
        self.0.is_none()
    }

    pub fn value(&self) -> Option<u64> {
        self.0
    }

    pub fn min(self, other: MaxCard) -> MaxCard {
        match (self.0, other.0) {
            (Some(a), Some(b)) => Self(Some(a.min(b))),
            (Some(a), None) | (None, Some(a)) => Self(Some(a)),
            (None, None) => Self(None),
        }
    }

    /// Bound of a cross product. Zero on either side wins over unbounded.
    pub fn product(self, other: MaxCard) -> MaxCard {
        match (self.0, other.0) {
            (Some(0), _) | (_, Some(0)) => Self::zero(),
            (Some(a), Some(b)) => Self(a.checked_mul(b)),
            _ => Self(None),
        }
    }

    /// At least one: an outer join emits every preserved row even without a
    /// match.
    pub fn at_least_one(self) -> MaxCard {
        match self.0 {
            Some(0) => Self(Some(1)),
            other => Self(other),
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.0.map_or(f64::INFINITY, |v| v as f64)
    }
}

impl fmt::Display for MaxCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "unbounded"),
        }
    }
}

/// Candidate keys: each set uniquely identifies a row of the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCollection {
    keys: Vec<ColumnSet>,
}

impl KeyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: impl IntoIterator<Item = ColumnSet>) -> Self {
        let mut collection = Self::new();
        for key in keys {
            collection.add(key);
        }
        collection
    }

    /// Adds `key` unless it is empty or already present.
    pub fn add(&mut self, key: ColumnSet) {
        if !key.is_empty() && !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    pub fn keys(&self) -> &[ColumnSet] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &ColumnSet) -> bool {
        self.keys.contains(key)
    }

    /// Keys of a join: the union of every left key with every right key.
    pub fn pairwise_union(&self, other: &KeyCollection) -> KeyCollection {
        let mut out = KeyCollection::new();
        for left in &self.keys {
            for right in &other.keys {
                out.add(left.union(right).copied().collect());
            }
        }
        out
    }

    /// Keys made only of `columns`.
    pub fn restrict(&self, columns: &ColumnSet) -> KeyCollection {
        KeyCollection::from_keys(
            self.keys
                .iter()
                .filter(|key| key.is_subset(columns))
                .cloned(),
        )
    }

    /// Substitute every column. A key with an unmapped column does not
    /// survive.
    pub fn remap(&self, mapping: &ColumnMapping) -> KeyCollection {
        KeyCollection::from_keys(self.keys.iter().filter_map(|key| {
            key.iter()
                .map(|col| mapping.get(col).copied())
                .collect::<Option<ColumnSet>>()
        }))
    }
}

/// Properties of a relational subtree.
#[derive(Debug, Clone)]
pub struct RelationalProps {
    pub output_columns: ColumnSet,
    pub outer_refs: ColumnSet,
    pub max_card: MaxCard,
    pub keys: KeyCollection,
    pub constraint: PropConstraint,
    pub stats: Arc<Statistics>,
}

/// Properties of a scalar subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalarProps {
    pub used_columns: ColumnSet,
    pub defined_columns: ColumnSet,
    /// The subtree contains a subquery.
    pub has_subquery: bool,
    /// The subtree calls a set-returning function.
    pub has_non_scalar_function: bool,
}

/// Cached properties of a node, relational or scalar by the node's operator.
#[derive(Debug, Clone)]
pub enum DerivedProps {
    Relational(Arc<RelationalProps>),
    Scalar(Arc<ScalarProps>),
}

impl DerivedProps {
    pub fn as_relational(&self) -> Option<&Arc<RelationalProps>> {
        match self {
            DerivedProps::Relational(p) => Some(p),
            DerivedProps::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Arc<ScalarProps>> {
        match self {
            DerivedProps::Scalar(p) => Some(p),
            DerivedProps::Relational(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnId;

    fn set(ids: &[u32]) -> ColumnSet {
        ids.iter().map(|&i| ColumnId(i)).collect()
    }

    #[test]
    fn test_max_card_arithmetic() {
        let ten = MaxCard::bounded(10);
        assert_eq!(ten.min(MaxCard::unbounded()), ten);
        assert_eq!(ten.min(MaxCard::bounded(3)), MaxCard::bounded(3));
        assert_eq!(ten.product(MaxCard::bounded(4)), MaxCard::bounded(40));
        assert_eq!(MaxCard::zero().product(MaxCard::unbounded()), MaxCard::zero());
        assert!(ten.product(MaxCard::unbounded()).is_unbounded());
        assert!(MaxCard::bounded(u64::MAX).product(ten).is_unbounded());
        assert_eq!(MaxCard::zero().at_least_one(), MaxCard::bounded(1));
        assert_eq!(MaxCard::unbounded().as_f64(), f64::INFINITY);
    }

    #[test]
    fn test_key_pairwise_union() {
        let left = KeyCollection::from_keys([set(&[1]), set(&[2, 3])]);
        let right = KeyCollection::from_keys([set(&[7])]);
        let joined = left.pairwise_union(&right);
        assert_eq!(joined.keys(), &[set(&[1, 7]), set(&[2, 3, 7])]);
        assert!(left.pairwise_union(&KeyCollection::new()).is_empty());
    }

    #[test]
    fn test_key_remap() {
        let keys = KeyCollection::from_keys([set(&[1])]);
        let mapping: ColumnMapping = [(ColumnId(1), ColumnId(9))].into_iter().collect();
        assert_eq!(keys.remap(&mapping).keys(), &[set(&[9])]);
        assert!(keys.remap(&ColumnMapping::new()).is_empty());
        assert!(keys.restrict(&set(&[2])).is_empty());
    }
}
