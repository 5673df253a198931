//! Transformation candidates per logical operator kind.
//!
//! The search engine asks [`XformRegistry::candidates`] which transformations
//! may fire on an expression before it tries to match any of them. The table
//! is filled once through [`XformRegistryBuilder`], which refuses to build
//! unless every [`LogicalOpKind`] has an entry.

use crate::error::{OptError, Result};
use crate::expr::LogicalOpKind;
use std::fmt;
use tracing::debug;

/// A transformation known to the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum XformId {
    ImplementLimit,
    SplitLimit,
    SimplifyProjectWithSubquery,
    Project2Apply,
    Project2ComputeScalar,
    CollapseProject,
    Get2TableScan,
    ImplementConstTableGet,
    Select2Filter,
    Select2Apply,
    SimplifySelectWithSubquery,
    SplitGbAgg,
    GbAgg2HashAgg,
    GbAgg2StreamAgg,
    PushGbBelowJoin,
    InnerJoinCommutativity,
    JoinAssociativity,
    InnerJoin2HashJoin,
    InnerJoin2NLJoin,
    LeftOuterJoin2HashJoin,
    LeftOuterJoin2NLJoin,
    CteAnchor2Sequence,
    CteAnchor2TrivialSelect,
    ImplementCteProducer,
    ImplementCteConsumer,
}

impl XformId {
    pub const COUNT: usize = 25;

    pub const ALL: [XformId; Self::COUNT] = [
        XformId::ImplementLimit,
        XformId::SplitLimit,
        XformId::SimplifyProjectWithSubquery,
        XformId::Project2Apply,
        XformId::Project2ComputeScalar,
        XformId::CollapseProject,
        XformId::Get2TableScan,
        XformId::ImplementConstTableGet,
        XformId::Select2Filter,
        XformId::Select2Apply,
        XformId::SimplifySelectWithSubquery,
        XformId::SplitGbAgg,
        XformId::GbAgg2HashAgg,
        XformId::GbAgg2StreamAgg,
        XformId::PushGbBelowJoin,
        XformId::InnerJoinCommutativity,
        XformId::JoinAssociativity,
        XformId::InnerJoin2HashJoin,
        XformId::InnerJoin2NLJoin,
        XformId::LeftOuterJoin2HashJoin,
        XformId::LeftOuterJoin2NLJoin,
        XformId::CteAnchor2Sequence,
        XformId::CteAnchor2TrivialSelect,
        XformId::ImplementCteProducer,
        XformId::ImplementCteConsumer,
    ];

    fn bit(self) -> u64 {
        1 << (self as u32)
    }
}

impl fmt::Display for XformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A set of transformations, one bit per [`XformId`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct XformSet(u64);

impl XformSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, id: XformId) -> Self {
        self.insert(id);
        self
    }

    pub fn insert(&mut self, id: XformId) {
        self.0 |= id.bit();
    }

    pub fn contains(&self, id: XformId) -> bool {
        self.0 & id.bit() != 0
    }

    pub fn union(&self, other: &XformSet) -> XformSet {
        XformSet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = XformId> + '_ {
        XformId::ALL.into_iter().filter(move |id| self.contains(*id))
    }
}

impl FromIterator<XformId> for XformSet {
    fn from_iter<I: IntoIterator<Item = XformId>>(iter: I) -> Self {
        iter.into_iter().fold(XformSet::empty(), XformSet::with)
    }
}

impl fmt::Display for XformSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Default)]
pub struct XformRegistryBuilder {
    entries: [Option<XformSet>; LogicalOpKind::COUNT],
}

impl XformRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the candidates for `kind`, replacing any earlier entry.
    pub fn register(mut self, kind: LogicalOpKind, candidates: XformSet) -> Self {
        self.entries[kind.index()] = Some(candidates);
        self
    }

    pub fn build(self) -> Result<XformRegistry> {
        let mut candidates = [XformSet::empty(); LogicalOpKind::COUNT];
        for kind in LogicalOpKind::ALL {
            match self.entries[kind.index()] {
                Some(set) => candidates[kind.index()] = set,
                None => {
                    return Err(OptError::invariant(format!(
                        "no transformation candidates registered for {:?}",
                        kind
                    )))
                }
            }
        }
        debug!(kinds = LogicalOpKind::COUNT, "built transformation registry");
        Ok(XformRegistry { candidates })
    }
}

/// Complete operator-kind to candidate-set table.
#[derive(Debug, Clone)]
pub struct XformRegistry {
    candidates: [XformSet; LogicalOpKind::COUNT],
}

impl XformRegistry {
    pub fn candidates(&self, kind: LogicalOpKind) -> XformSet {
        self.candidates[kind.index()]
    }
}
