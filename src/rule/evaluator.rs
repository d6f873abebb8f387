//! Rule evaluator

use crate::error::Result;
use crate::rule::ast::{AstNode, ComparisonOperator, LogicalOperator};
use crate::rule::value::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Input data a rule is evaluated against
pub type Record = HashMap<String, Value>;

/// What a comparison side resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    /// The operand named a key present in the record
    Field(&'a Value),
    /// No such key: the operand stands for itself
    Literal(&'a Value),
    /// A compound child evaluated to a verdict
    Verdict(bool),
}

impl<'a> Resolved<'a> {
    pub fn value(&self) -> Cow<'a, Value> {
        match self {
            Resolved::Field(v) | Resolved::Literal(v) => Cow::Borrowed(*v),
            Resolved::Verdict(b) => Cow::Owned(Value::Bool(*b)),
        }
    }
}

/// Record lookup by the operand's text, falling back to the operand itself
pub fn resolve_operand<'a>(value: &'a Value, record: &'a Record) -> Resolved<'a> {
    let key: Cow<'_, str> = match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    };
    match record.get(key.as_ref()) {
        Some(field) => Resolved::Field(field),
        None => Resolved::Literal(value),
    }
}

/// Evaluate an AST against a record. A missing AST is `false`.
pub fn evaluate(ast: Option<&AstNode>, record: &Record) -> bool {
    let verdict = ast.is_some_and(|node| check(node, record));
    log::trace!("rule evaluated to {}", verdict);
    verdict
}

/// Decode a stored JSON tree and evaluate it
pub fn evaluate_json(json: &str, record: &Record) -> Result<bool> {
    let ast = AstNode::from_json(json)?;
    Ok(evaluate(Some(&ast), record))
}

/// Boolean verdict of a node. Both sides of a logical node are always evaluated.
pub fn check(ast: &AstNode, record: &Record) -> bool {
    match ast {
        AstNode::Logical {
            operator,
            left,
            right,
        } => {
            let left = check(left, record);
            let right = check(right, record);
            match operator {
                LogicalOperator::And => left && right,
                LogicalOperator::Or => left || right,
            }
        }
        AstNode::Comparison {
            operator,
            left,
            right,
        } => {
            let left = resolve_side(left, record);
            let right = resolve_side(right, record);
            compare(*operator, &left.value(), &right.value())
        }
        AstNode::Operand { value } => resolve_operand(value, record).value().is_truthy(),
    }
}

fn resolve_side<'a>(node: &'a AstNode, record: &'a Record) -> Resolved<'a> {
    match node {
        AstNode::Operand { value } => resolve_operand(value, record),
        compound => Resolved::Verdict(check(compound, record)),
    }
}

/// Apply a comparison operator to two resolved values
pub fn compare(operator: ComparisonOperator, left: &Value, right: &Value) -> bool {
    if operator == ComparisonOperator::Equal {
        return loose_eq(left, right);
    }

    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };

    match (operator, ordering) {
        (_, None) => false,
        (ComparisonOperator::Greater, Some(ord)) => ord == Ordering::Greater,
        (ComparisonOperator::GreaterEqual, Some(ord)) => ord != Ordering::Less,
        (ComparisonOperator::Less, Some(ord)) => ord == Ordering::Less,
        (ComparisonOperator::LessEqual, Some(ord)) => ord != Ordering::Greater,
        (ComparisonOperator::Equal, Some(ord)) => ord == Ordering::Equal,
    }
}

/// Type-coercing equality: `"30" == 30` and `true == 1` hold
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(l), Value::String(r)) => l == r,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Number(l), Value::Number(r)) => l == r,
        _ => left.to_number() == right.to_number(),
    }
}
