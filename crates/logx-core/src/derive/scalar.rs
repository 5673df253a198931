//! Scalar properties: children's facts unioned, plus what the operator itself
//! references, defines or calls.

use super::ExprHandle;
use crate::error::Result;
use crate::expr::ScalarOp;
use crate::properties::{DerivedProps, ScalarProps};

pub(super) fn derive_scalar(handle: &ExprHandle<'_>, op: &ScalarOp) -> Result<ScalarProps> {
    let mut props = ScalarProps::default();
    for child in handle.children_props() {
        match child {
            DerivedProps::Scalar(s) => {
                props.used_columns.extend(s.used_columns.iter().copied());
                props.defined_columns.extend(s.defined_columns.iter().copied());
                props.has_subquery |= s.has_subquery;
                props.has_non_scalar_function |= s.has_non_scalar_function;
            }
            // A subquery uses whatever its relational input references from
            // the enclosing scope.
            DerivedProps::Relational(r) => {
                props.used_columns.extend(r.outer_refs.iter().copied());
            }
        }
    }

    match op {
        ScalarOp::Ident { column } => {
            props.used_columns.insert(*column);
        }
        ScalarOp::ProjectElement { column } => {
            props.defined_columns.insert(*column);
        }
        ScalarOp::Func { func, .. } => {
            if handle.session().catalog().function(func)?.returns_set {
                props.has_non_scalar_function = true;
            }
        }
        ScalarOp::Subquery { .. } => props.has_subquery = true,
        ScalarOp::Const { .. }
        | ScalarOp::Cmp { .. }
        | ScalarOp::BoolExpr { .. }
        | ScalarOp::NullTest { .. }
        | ScalarOp::AggFunc { .. }
        | ScalarOp::ProjectList => {}
    }
    Ok(props)
}
