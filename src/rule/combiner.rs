//! Fold several rule ASTs into one

use crate::error::Result;
use crate::rule::ast::{check_depth, AstNode, LogicalOperator};

/// Left-fold `asts` into a single logical tree joined by `operator`.
///
/// `[A, B, C]` becomes `((A op B) op C)`. An empty input yields `None`
/// before the operator is looked at; a single input is returned as is.
/// Every fold step adds a level, so the result must stay within
/// [`MAX_DEPTH`](crate::rule::MAX_DEPTH).
pub fn combine<I>(asts: I, operator: &str) -> Result<Option<AstNode>>
where
    I: IntoIterator<Item = AstNode>,
{
    let mut asts = asts.into_iter();
    let Some(first) = asts.next() else {
        return Ok(None);
    };
    let operator = operator.parse::<LogicalOperator>()?;

    let mut depth = first.depth();
    let mut combined = first;
    for current in asts {
        depth = depth.max(current.depth()) + 1;
        check_depth(depth)?;
        combined = AstNode::logical(operator, combined, current);
    }
    Ok(Some(combined))
}
