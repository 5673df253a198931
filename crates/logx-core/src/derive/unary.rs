//! Select, GbAgg and CteProducer.

use super::{is_false_or_null, ExprHandle, LocalProps};
use crate::column::{ColumnId, ColumnSet};
use crate::constraint::from_predicate;
use crate::error::Result;
use crate::expr::AggStage;
use crate::properties::{KeyCollection, MaxCard};
use crate::stats::{derive_aggregate_stats, derive_filter_stats, estimate_selectivity};
use std::sync::Arc;

pub(super) fn derive_select(handle: &ExprHandle<'_>) -> Result<LocalProps> {
    let child = handle.relational(0)?;
    let predicate = handle.child_node(1)?;

    let constraint =
        from_predicate(predicate, handle.session().columns())?.conjoin(&child.constraint);
    let max_card = if is_false_or_null(predicate) || constraint.is_contradiction() {
        MaxCard::zero()
    } else {
        child.max_card
    };
    let stats = derive_filter_stats(&child.stats, estimate_selectivity(predicate, &child.stats));

    Ok(LocalProps {
        output_columns: child.output_columns.clone(),
        max_card,
        keys: child.keys.clone(),
        constraint,
        stats: Arc::new(stats),
    })
}

pub(super) fn derive_gb_agg(
    handle: &ExprHandle<'_>,
    grouping: &[ColumnId],
    stage: AggStage,
) -> Result<LocalProps> {
    let child = handle.relational(0)?;
    let aggregates = handle.scalar(1)?;
    let grouping_set: ColumnSet = grouping.iter().copied().collect();

    let mut output_columns = if grouping.is_empty() {
        child.output_columns.clone()
    } else {
        grouping_set.clone()
    };
    output_columns.extend(aggregates.defined_columns.iter().copied());

    // Only the final stage sees each group once; a local or intermediate
    // stage emits one row per group per partition.
    let global = stage == AggStage::Global;
    let max_card = if grouping.is_empty() && global {
        MaxCard::bounded(1)
    } else {
        child.max_card
    };

    let mut keys = KeyCollection::new();
    if global {
        keys.add(grouping_set.clone());
    }

    let row_width = handle.session().config().default_row_width;
    Ok(LocalProps {
        output_columns,
        max_card,
        keys,
        constraint: child.constraint.restrict(&grouping_set),
        stats: Arc::new(derive_aggregate_stats(&child.stats, grouping, row_width)),
    })
}

pub(super) fn derive_cte_producer(
    handle: &ExprHandle<'_>,
    columns: &[ColumnId],
) -> Result<LocalProps> {
    let mut props = LocalProps::pass_through(handle.relational(0)?);
    props.output_columns = columns.iter().copied().collect();
    Ok(props)
}
