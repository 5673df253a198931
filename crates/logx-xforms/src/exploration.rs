//! Logical alternatives per operator kind.
//!
//! Leaves and the CTE producer/consumer have nothing to explore: their only
//! alternatives are physical.

use logx_core::expr::LogicalOpKind;
use logx_core::xform::{XformId, XformSet};

pub fn candidates(kind: LogicalOpKind) -> XformSet {
    use XformId::*;
    let ids: &[XformId] = match kind {
        LogicalOpKind::Get => &[],
        LogicalOpKind::ConstTableGet => &[],
        LogicalOpKind::Select => &[Select2Apply, SimplifySelectWithSubquery],
        LogicalOpKind::Project => &[SimplifyProjectWithSubquery, Project2Apply, CollapseProject],
        LogicalOpKind::Limit => &[SplitLimit],
        LogicalOpKind::GbAgg => &[SplitGbAgg, PushGbBelowJoin],
        LogicalOpKind::InnerJoin => &[InnerJoinCommutativity, JoinAssociativity],
        // Outer joins have fixed sides.
        LogicalOpKind::LeftOuterJoin => &[],
        LogicalOpKind::CteAnchor => &[CteAnchor2TrivialSelect],
        LogicalOpKind::CteProducer => &[],
        LogicalOpKind::CteConsumer => &[],
    };
    ids.iter().copied().collect()
}
