//! Path addressing and structural edits
//!
//! Every edit takes the current tree by reference and returns a new tree.
//! Only the nodes along the edited path are rebuilt; all other subtrees are
//! shared with the input, which is left untouched on success and on error.

use crate::error::{Result, RuleEngineError};
use crate::rule::ast::{check_depth, AstNode, ComparisonOperator, LogicalOperator};
use crate::rule::path::{Branch, NodePath};
use crate::rule::value::Value;
use std::sync::Arc;

// ============================================================================
// Addressing
// ============================================================================

/// Node at `path`, or `None` when the path walks off the tree
pub fn resolve<'a>(ast: &'a AstNode, path: &NodePath) -> Option<&'a AstNode> {
    path.iter()
        .try_fold(ast, |node, branch| node.child(branch).map(Arc::as_ref))
}

/// New tree with the node at `path` replaced by `new_node`.
/// The empty path replaces the whole tree. Fails with `TooDeep` when the
/// new node would end up deeper than [`MAX_DEPTH`](crate::rule::MAX_DEPTH).
pub fn replace(ast: &AstNode, path: &NodePath, new_node: AstNode) -> Result<AstNode> {
    let depth = path.len() + new_node.depth();
    let rebuilt = rebuild(ast, path.steps(), new_node).ok_or_else(|| {
        RuleEngineError::InvalidPath(format!("'{}' does not exist in the tree", path))
    })?;
    check_depth(depth)?;
    Ok(rebuilt)
}

fn rebuild(node: &AstNode, steps: &[Branch], new_node: AstNode) -> Option<AstNode> {
    let Some((&first, rest)) = steps.split_first() else {
        return Some(new_node);
    };
    let child = node.child(first)?;
    let replaced = rebuild(child, rest, new_node)?;
    node.with_child(first, replaced)
}

// ============================================================================
// Editing
// ============================================================================

/// Operator text of the node at `path`
pub fn get_operator(ast: &AstNode, path: &NodePath) -> Result<&'static str> {
    resolve(ast, path)
        .and_then(AstNode::operator)
        .ok_or_else(|| operator_not_found(path))
}

/// Overwrite the operator of the logical or comparison node at `path`.
///
/// The new operator is case-folded and must belong to the node's kind:
/// `AND`/`OR` for logical nodes, `>`, `>=`, `<`, `<=`, `==` for comparisons.
pub fn set_operator(ast: &AstNode, path: &NodePath, new_operator: &str) -> Result<AstNode> {
    let updated = match resolve(ast, path) {
        Some(AstNode::Logical { left, right, .. }) => AstNode::Logical {
            operator: new_operator.parse::<LogicalOperator>()?,
            left: Arc::clone(left),
            right: Arc::clone(right),
        },
        Some(AstNode::Comparison { left, right, .. }) => AstNode::Comparison {
            operator: new_operator.parse::<ComparisonOperator>()?,
            left: Arc::clone(left),
            right: Arc::clone(right),
        },
        Some(AstNode::Operand { .. }) | None => return Err(operator_not_found(path)),
    };
    replace(ast, path, updated)
}

/// Overwrite the value of the operand at `path`. The catalog is not consulted.
/// NaN and infinite numbers are refused since JSON cannot carry them.
pub fn set_operand(ast: &AstNode, path: &NodePath, new_value: impl Into<Value>) -> Result<AstNode> {
    let new_value = new_value.into();
    if let Value::Number(n) = &new_value {
        if !n.is_finite() {
            return Err(RuleEngineError::InvalidValue(format!("{} is not a finite number", n)));
        }
    }
    match resolve(ast, path) {
        Some(AstNode::Operand { .. }) => replace(ast, path, AstNode::operand(new_value)),
        _ => Err(RuleEngineError::NodeNotFound(format!(
            "operand not found at path '{}'",
            path
        ))),
    }
}

/// Demote the node at `path` to the left child of a new logical node whose
/// right child is `expression`. The operator defaults to `AND`.
pub fn add_sub_expression(
    ast: &AstNode,
    path: &NodePath,
    expression: AstNode,
    operator: Option<&str>,
) -> Result<AstNode> {
    let node = resolve(ast, path).ok_or_else(|| {
        RuleEngineError::NodeNotFound(format!("node not found at path '{}'", path))
    })?;
    let operator = match operator {
        Some(op) => op.parse::<LogicalOperator>()?,
        None => LogicalOperator::And,
    };
    let combined = AstNode::logical(operator, node.clone(), expression);
    replace(ast, path, combined)
}

/// Delete the node at `path` by collapsing its parent into the sibling
pub fn remove_sub_expression(ast: &AstNode, path: &NodePath) -> Result<AstNode> {
    let (parent_path, branch) = path.split_last().ok_or_else(|| {
        RuleEngineError::InvalidPath("the root expression cannot be removed".to_string())
    })?;
    let parent = resolve(ast, &parent_path).ok_or_else(|| sub_expression_not_found(path))?;
    if parent.child(branch).is_none() {
        return Err(sub_expression_not_found(path));
    }
    let sibling = parent
        .child(branch.sibling())
        .ok_or_else(|| sub_expression_not_found(path))?;
    replace(ast, &parent_path, sibling.as_ref().clone())
}

fn operator_not_found(path: &NodePath) -> RuleEngineError {
    RuleEngineError::NodeNotFound(format!("operator not found at path '{}'", path))
}

fn sub_expression_not_found(path: &NodePath) -> RuleEngineError {
    RuleEngineError::NodeNotFound(format!("sub-expression not found at path '{}'", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parser::parse;

    fn path(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve() {
        let ast = parse("age > 30 AND department == 'HR'").unwrap();
        assert_eq!(resolve(&ast, &NodePath::root()), Some(&ast));
        assert_eq!(
            resolve(&ast, &path("left.left")),
            Some(&AstNode::operand("age"))
        );
        assert_eq!(
            resolve(&ast, &path("right.right")),
            Some(&AstNode::operand("HR"))
        );
        // Walking through an operand
        assert_eq!(resolve(&ast, &path("left.left.right")), None);
    }

    #[test]
    fn test_replace() {
        let ast = parse("age > 30 AND salary > 100").unwrap();
        let replaced = replace(&ast, &path("left.right"), AstNode::operand(40)).unwrap();
        assert_eq!(replaced, parse("age > 40 AND salary > 100").unwrap());

        let root = replace(&ast, &NodePath::root(), AstNode::operand(true)).unwrap();
        assert_eq!(root, AstNode::operand(true));

        let err = replace(&ast, &path("left.left.left"), AstNode::operand(1)).unwrap_err();
        assert!(matches!(err, RuleEngineError::InvalidPath(_)));
    }

    #[test]
    fn test_replace_shares_untouched_subtrees() {
        let ast = parse("age > 30 AND salary > 100").unwrap();
        let replaced = replace(&ast, &path("left.right"), AstNode::operand(40)).unwrap();
        assert!(Arc::ptr_eq(
            ast.child(Branch::Right).unwrap(),
            replaced.child(Branch::Right).unwrap()
        ));
    }

    #[test]
    fn test_get_and_set_operator() {
        let ast = parse("age > 30 AND salary > 100").unwrap();
        assert_eq!(get_operator(&ast, &NodePath::root()).unwrap(), "AND");
        assert_eq!(get_operator(&ast, &path("left")).unwrap(), ">");

        let updated = set_operator(&ast, &NodePath::root(), "or").unwrap();
        assert_eq!(get_operator(&updated, &NodePath::root()).unwrap(), "OR");
        // The input is unchanged
        assert_eq!(get_operator(&ast, &NodePath::root()).unwrap(), "AND");

        let updated = set_operator(&ast, &path("right"), "<=").unwrap();
        assert_eq!(updated, parse("age > 30 AND salary <= 100").unwrap());
    }

    #[test]
    fn test_set_operator_errors() {
        let ast = parse("age > 30 AND salary > 100").unwrap();

        let err = set_operator(&ast, &path("left.left"), "OR").unwrap_err();
        assert!(matches!(err, RuleEngineError::NodeNotFound(_)));

        let err = set_operator(&ast, &path("left.left.left"), "OR").unwrap_err();
        assert!(matches!(err, RuleEngineError::NodeNotFound(_)));

        // Operators must fit the node kind
        let err = set_operator(&ast, &path("left"), "AND").unwrap_err();
        assert!(matches!(err, RuleEngineError::UnsupportedOperator(_)));
        let err = set_operator(&ast, &NodePath::root(), ">").unwrap_err();
        assert!(matches!(err, RuleEngineError::UnsupportedOperator(_)));
    }

    #[test]
    fn test_set_operand() {
        let ast = parse("age > 30").unwrap();
        let updated = set_operand(&ast, &path("right"), 45).unwrap();
        assert_eq!(updated, parse("age > 45").unwrap());

        // No catalog check on edits
        let updated = set_operand(&ast, &path("left"), "height").unwrap();
        assert_eq!(resolve(&updated, &path("left")), Some(&AstNode::operand("height")));

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = set_operand(&ast, &path("right"), bad).unwrap_err();
            assert!(matches!(err, RuleEngineError::InvalidValue(_)));
        }

        let err = set_operand(&ast, &NodePath::root(), 1).unwrap_err();
        assert!(matches!(err, RuleEngineError::NodeNotFound(_)));
        let err = set_operand(&ast, &path("right.left"), 1).unwrap_err();
        assert!(matches!(err, RuleEngineError::NodeNotFound(_)));
    }

    #[test]
    fn test_add_sub_expression() {
        let ast = parse("age > 30 AND salary > 100").unwrap();
        let extra = parse("experience >= 5").unwrap();

        let updated = add_sub_expression(&ast, &path("right"), extra.clone(), None).unwrap();
        assert_eq!(
            updated,
            parse("age > 30 AND (salary > 100 AND experience >= 5)").unwrap()
        );

        let updated = add_sub_expression(&ast, &NodePath::root(), extra.clone(), Some("or")).unwrap();
        assert_eq!(
            updated,
            parse("(age > 30 AND salary > 100) OR experience >= 5").unwrap()
        );

        let err = add_sub_expression(&ast, &path("left.left.left"), extra.clone(), None).unwrap_err();
        assert!(matches!(err, RuleEngineError::NodeNotFound(_)));

        let err = add_sub_expression(&ast, &path("left"), extra, Some(">")).unwrap_err();
        assert!(matches!(err, RuleEngineError::UnsupportedOperator(_)));
    }

    #[test]
    fn test_add_sub_expression_depth_limit() {
        use crate::rule::ast::MAX_DEPTH;

        let deepest = parse(&vec!["age > 1"; MAX_DEPTH - 1].join(" AND ")).unwrap();
        let extra = parse("salary > 2").unwrap();

        let err = add_sub_expression(&deepest, &NodePath::root(), extra.clone(), None).unwrap_err();
        assert_eq!(err, RuleEngineError::TooDeep(MAX_DEPTH));

        // Growing a shallow branch is fine
        let updated = add_sub_expression(&deepest, &path("right"), extra, None).unwrap();
        assert_eq!(updated.depth(), MAX_DEPTH);
    }

    #[test]
    fn test_remove_sub_expression_collapses_to_sibling() {
        let ast = parse("age > 30 AND salary > 100").unwrap();

        let updated = remove_sub_expression(&ast, &path("right")).unwrap();
        assert_eq!(updated, parse("age > 30").unwrap());

        let updated = remove_sub_expression(&ast, &path("left")).unwrap();
        assert_eq!(updated, parse("salary > 100").unwrap());
    }

    #[test]
    fn test_remove_nested_sub_expression() {
        let ast = parse("age > 30 AND (salary > 100 OR experience > 2)").unwrap();
        let updated = remove_sub_expression(&ast, &path("right.left")).unwrap();
        assert_eq!(updated, parse("age > 30 AND experience > 2").unwrap());
        assert!(Arc::ptr_eq(
            ast.child(Branch::Left).unwrap(),
            updated.child(Branch::Left).unwrap()
        ));
    }

    #[test]
    fn test_remove_sub_expression_errors() {
        let ast = parse("age > 30 AND salary > 100").unwrap();

        let err = remove_sub_expression(&ast, &NodePath::root()).unwrap_err();
        assert!(matches!(err, RuleEngineError::InvalidPath(_)));

        let err = remove_sub_expression(&ast, &path("left.left.left")).unwrap_err();
        assert!(matches!(err, RuleEngineError::NodeNotFound(_)));

        let err = remove_sub_expression(&ast, &path("right.right.left.left")).unwrap_err();
        assert!(matches!(err, RuleEngineError::NodeNotFound(_)));
    }
}
