//! Leaves: base-table scans, literal tables and CTE consumers.

use super::{ExprHandle, LocalProps};
use crate::catalog::MdId;
use crate::column::{ColumnId, ColumnSet};
use crate::constraint::{Constraint, ConstraintInterval, EquivalenceClasses, PropConstraint};
use crate::error::{OptError, Result};
use crate::expr::ScalarValue;
use crate::properties::{KeyCollection, MaxCard};
use crate::stats::{derive_const_table_stats, remap_statistics, Statistics};
use std::sync::Arc;
use tracing::warn;

pub(super) fn derive_get(
    handle: &ExprHandle<'_>,
    table: &MdId,
    columns: &[ColumnId],
) -> Result<LocalProps> {
    let session = handle.session();
    let relation = session.catalog().relation(table)?;
    if relation.columns.len() != columns.len() {
        return Err(OptError::unsupported(format!(
            "scan of {} lists {} columns, relation has {}",
            relation.name,
            columns.len(),
            relation.columns.len()
        )));
    }

    let mut keys = KeyCollection::new();
    for key in &relation.keys {
        let key = key
            .iter()
            .map(|&pos| {
                columns.get(pos).copied().ok_or_else(|| {
                    OptError::unsupported(format!(
                        "key position {} out of range for {}",
                        pos, relation.name
                    ))
                })
            })
            .collect::<Result<ColumnSet>>()?;
        keys.add(key);
    }

    let mut not_null = Vec::new();
    for &column in columns {
        let desc = session.columns().lookup(column)?;
        if !desc.nullable && desc.data_type.is_constrainable() {
            not_null.push(Constraint::Interval(ConstraintInterval::not_null(column)));
        }
    }

    let config = session.config();
    let stats = match session.catalog().relation_stats(table) {
        Some(rel_stats) => Statistics::from_relation(&rel_stats, &relation, columns),
        None => {
            warn!(
                table = %relation.name,
                rows = config.default_row_count,
                "no statistics for relation, using default"
            );
            Statistics::new(
                config.default_row_count,
                config.default_row_count * config.default_row_width,
            )
        }
    };

    Ok(LocalProps {
        output_columns: columns.iter().copied().collect(),
        max_card: MaxCard::unbounded(),
        keys,
        constraint: PropConstraint::new(EquivalenceClasses::new(), Constraint::conjunction(not_null)),
        stats: Arc::new(stats),
    })
}

pub(super) fn derive_const_table(
    handle: &ExprHandle<'_>,
    columns: &[ColumnId],
    rows: &[Vec<ScalarValue>],
) -> Result<LocalProps> {
    let registry = handle.session().columns();
    let mut intervals = Vec::new();
    for (i, &column) in columns.iter().enumerate() {
        if !registry.lookup(column)?.data_type.is_constrainable() {
            continue;
        }
        let mut values = ConstraintInterval::contradiction(column);
        for row in rows {
            if let Some(value) = row.get(i) {
                values = values.union(&ConstraintInterval::point(column, value.clone()));
            }
        }
        intervals.push(Constraint::Interval(values));
    }

    Ok(LocalProps {
        output_columns: columns.iter().copied().collect(),
        max_card: MaxCard::bounded(rows.len() as u64),
        keys: KeyCollection::new(),
        constraint: PropConstraint::new(EquivalenceClasses::new(), Constraint::conjunction(intervals)),
        stats: Arc::new(derive_const_table_stats(columns, rows)),
    })
}

/// The producer's properties with its columns renamed to the consumer's.
pub(super) fn derive_cte_consumer(
    handle: &ExprHandle<'_>,
    cte_id: u32,
    columns: &[ColumnId],
) -> Result<LocalProps> {
    let session = handle.session();
    let cte_info = session.cte_info();
    let mapping = cte_info.consumer_mapping(cte_id, columns)?;
    let producer = session.relational_props(cte_info.producer(cte_id)?)?;

    Ok(LocalProps {
        output_columns: columns.iter().copied().collect(),
        max_card: producer.max_card,
        keys: producer.keys.remap(&mapping),
        constraint: producer.constraint.remap(&mapping),
        stats: Arc::new(remap_statistics(&producer.stats, &mapping)),
    })
}
