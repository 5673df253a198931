//! Limit: children are input, offset and count.

use super::{ExprHandle, LocalProps};
use crate::error::Result;
use crate::expr::{Operator, ScalarOp};
use crate::properties::MaxCard;
use crate::stats::bound_statistics;

pub(super) fn derive_limit(handle: &ExprHandle<'_>, has_count: bool) -> Result<LocalProps> {
    let child = handle.relational(0)?;
    let count = handle.child_node(2)?;

    // Without has_count the count child is a placeholder.
    let mut max_card = child.max_card;
    if has_count {
        if let Operator::Scalar(ScalarOp::Const { value, .. }) = count.op() {
            if let Some(k) = value.as_row_count() {
                max_card = max_card.min(MaxCard::bounded(k));
            }
        }
    }

    let mut props = LocalProps::pass_through(child);
    props.max_card = max_card;
    // Child statistics within the bound are reused as the same object.
    props.stats = bound_statistics(&child.stats, max_card);
    Ok(props)
}
