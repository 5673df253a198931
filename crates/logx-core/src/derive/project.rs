//! Project: the input plus the columns defined by the project list.

use super::{ExprHandle, LocalProps};
use crate::column::ColumnId;
use crate::constraint::project_constraint;
use crate::error::Result;
use crate::expr::{Operator, ScalarOp, ScalarValue};
use crate::node::ExprNode;
use crate::properties::{KeyCollection, MaxCard};
use crate::stats::derive_project_stats;
use std::collections::HashMap;
use std::sync::Arc;

pub(super) fn derive_project(handle: &ExprHandle<'_>) -> Result<LocalProps> {
    let child = handle.relational(0)?;
    let list = handle.scalar(1)?;
    let list_node = handle.child_node(1)?;

    let mut output_columns = child.output_columns.clone();
    output_columns.extend(list.defined_columns.iter().copied());

    // A set-returning function can emit any number of rows per input row,
    // which breaks both the bound and the keys.
    let (max_card, keys) = if list.has_non_scalar_function {
        (MaxCard::unbounded(), KeyCollection::new())
    } else {
        (child.max_card, child.keys.clone())
    };

    let constraint = project_constraint(
        &child.constraint,
        list_node,
        list.has_subquery,
        handle.session().columns(),
    )?;

    let constants = literal_columns(list_node);
    let stats = derive_project_stats(&child.stats, &output_columns, &constants);

    Ok(LocalProps {
        output_columns,
        max_card,
        keys,
        constraint,
        stats: Arc::new(stats),
    })
}

/// Columns bound directly to a literal.
fn literal_columns(list: &ExprNode) -> HashMap<ColumnId, ScalarValue> {
    list.children()
        .iter()
        .filter_map(|element| match (element.op(), element.children().first()) {
            (Operator::Scalar(ScalarOp::ProjectElement { column }), Some(value)) => {
                match value.op() {
                    Operator::Scalar(ScalarOp::Const { value, .. }) => Some((*column, value.clone())),
                    _ => None,
                }
            }
            _ => None,
        })
        .collect()
}
