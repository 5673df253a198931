//! Physical implementations per operator kind.

use logx_core::expr::LogicalOpKind;
use logx_core::xform::{XformId, XformSet};

pub fn candidates(kind: LogicalOpKind) -> XformSet {
    use XformId::*;
    let ids: &[XformId] = match kind {
        LogicalOpKind::Get => &[Get2TableScan],
        LogicalOpKind::ConstTableGet => &[ImplementConstTableGet],
        LogicalOpKind::Select => &[Select2Filter],
        LogicalOpKind::Project => &[Project2ComputeScalar],
        LogicalOpKind::Limit => &[ImplementLimit],
        LogicalOpKind::GbAgg => &[GbAgg2HashAgg, GbAgg2StreamAgg],
        LogicalOpKind::InnerJoin => &[InnerJoin2HashJoin, InnerJoin2NLJoin],
        LogicalOpKind::LeftOuterJoin => &[LeftOuterJoin2HashJoin, LeftOuterJoin2NLJoin],
        LogicalOpKind::CteAnchor => &[CteAnchor2Sequence],
        LogicalOpKind::CteProducer => &[ImplementCteProducer],
        LogicalOpKind::CteConsumer => &[ImplementCteConsumer],
    };
    ids.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_an_implementation() {
        for kind in LogicalOpKind::ALL {
            assert!(!candidates(kind).is_empty(), "{:?}", kind);
        }
    }
}
