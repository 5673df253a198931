//! Inner and left outer joins: children are left, right and predicate.

use super::{is_false_or_null, ExprHandle, LocalProps};
use crate::constraint::from_predicate;
use crate::error::Result;
use crate::properties::MaxCard;
use crate::stats::{
    derive_filter_stats, derive_join_stats, derive_left_outer_join_stats, equi_join_columns,
    estimate_selectivity,
};
use std::sync::Arc;

pub(super) fn derive_inner_join(handle: &ExprHandle<'_>) -> Result<LocalProps> {
    let left = handle.relational(0)?;
    let right = handle.relational(1)?;
    let predicate = handle.child_node(2)?;

    let mut output_columns = left.output_columns.clone();
    output_columns.extend(right.output_columns.iter().copied());

    let constraint = left
        .constraint
        .conjoin(&right.constraint)
        .conjoin(&from_predicate(predicate, handle.session().columns())?);

    let max_card = if is_false_or_null(predicate) || constraint.is_contradiction() {
        MaxCard::zero()
    } else {
        left.max_card.product(right.max_card)
    };

    let join_columns = equi_join_columns(predicate);
    let stats = if join_columns.is_empty() {
        // Cross product filtered by whatever the predicate says.
        let cross = derive_join_stats(&left.stats, &right.stats, &[]);
        derive_filter_stats(&cross, estimate_selectivity(predicate, &cross))
    } else {
        derive_join_stats(&left.stats, &right.stats, &join_columns)
    };

    Ok(LocalProps {
        output_columns,
        max_card,
        keys: left.keys.pairwise_union(&right.keys),
        constraint,
        stats: Arc::new(stats),
    })
}

/// Every left row survives, so only the left side's facts hold on the output
/// and the bound is at least the left side's.
pub(super) fn derive_left_outer_join(handle: &ExprHandle<'_>) -> Result<LocalProps> {
    let left = handle.relational(0)?;
    let right = handle.relational(1)?;
    let predicate = handle.child_node(2)?;

    let mut output_columns = left.output_columns.clone();
    output_columns.extend(right.output_columns.iter().copied());

    let stats = derive_left_outer_join_stats(&left.stats, &right.stats, &equi_join_columns(predicate));

    Ok(LocalProps {
        output_columns,
        max_card: left.max_card.product(right.max_card.at_least_one()),
        keys: left.keys.pairwise_union(&right.keys),
        constraint: left.constraint.clone(),
        stats: Arc::new(stats),
    })
}
