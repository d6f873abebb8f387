//! Abstract Syntax Tree for rule expressions

use crate::error::{Result, RuleEngineError};
use crate::rule::path::Branch;
use crate::rule::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Deepest tree accepted from rule strings, JSON and edits, counting an
/// operand as one level. Stays below the nesting limit of `serde_json` so
/// every accepted tree also decodes from its JSON form.
pub const MAX_DEPTH: usize = 100;

/// `TooDeep` once `depth` passes [`MAX_DEPTH`]
pub(crate) fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(RuleEngineError::TooDeep(MAX_DEPTH));
    }
    Ok(())
}

/// Operator of a logical node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = RuleEngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            other => Err(RuleEngineError::UnsupportedOperator(format!(
                "logical operator {}",
                other
            ))),
        }
    }
}

/// Operator of a comparison node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// Greater than (>)
    #[serde(rename = ">")]
    Greater,
    /// Greater than or equal (>=)
    #[serde(rename = ">=")]
    GreaterEqual,
    /// Less than (<)
    #[serde(rename = "<")]
    Less,
    /// Less than or equal (<=)
    #[serde(rename = "<=")]
    LessEqual,
    /// Loose equality (==, also written =)
    #[serde(rename = "==")]
    Equal,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterEqual => ">=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessEqual => "<=",
            ComparisonOperator::Equal => "==",
        }
    }
}

impl FromStr for ComparisonOperator {
    type Err = RuleEngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" => Ok(ComparisonOperator::Greater),
            ">=" => Ok(ComparisonOperator::GreaterEqual),
            "<" => Ok(ComparisonOperator::Less),
            "<=" => Ok(ComparisonOperator::LessEqual),
            "==" | "=" => Ok(ComparisonOperator::Equal),
            other => Err(RuleEngineError::UnsupportedOperator(format!(
                "comparison operator {}",
                other
            ))),
        }
    }
}

/// AST node for rule expressions.
///
/// Children are reference counted so that edits can share every subtree
/// they do not touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireNode", try_from = "WireNode")]
pub enum AstNode {
    /// AND / OR of two sub-results
    Logical {
        operator: LogicalOperator,
        left: Arc<AstNode>,
        right: Arc<AstNode>,
    },
    /// Relational test between two resolved values
    Comparison {
        operator: ComparisonOperator,
        left: Arc<AstNode>,
        right: Arc<AstNode>,
    },
    /// Attribute name or literal, told apart at evaluation time
    Operand { value: Value },
}

impl AstNode {
    pub fn logical(operator: LogicalOperator, left: AstNode, right: AstNode) -> Self {
        AstNode::Logical {
            operator,
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    pub fn comparison(operator: ComparisonOperator, left: AstNode, right: AstNode) -> Self {
        AstNode::Comparison {
            operator,
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    pub fn operand(value: impl Into<Value>) -> Self {
        AstNode::Operand {
            value: value.into(),
        }
    }

    /// Wire name of the node kind
    pub fn kind(&self) -> &'static str {
        match self {
            AstNode::Logical { .. } => "logical",
            AstNode::Comparison { .. } => "comparison",
            AstNode::Operand { .. } => "operand",
        }
    }

    /// Operator text, `None` for operands
    pub fn operator(&self) -> Option<&'static str> {
        match self {
            AstNode::Logical { operator, .. } => Some(operator.as_str()),
            AstNode::Comparison { operator, .. } => Some(operator.as_str()),
            AstNode::Operand { .. } => None,
        }
    }

    pub fn child(&self, branch: Branch) -> Option<&Arc<AstNode>> {
        match self {
            AstNode::Logical { left, right, .. } | AstNode::Comparison { left, right, .. } => {
                match branch {
                    Branch::Left => Some(left),
                    Branch::Right => Some(right),
                }
            }
            AstNode::Operand { .. } => None,
        }
    }

    /// Copy of this node with one child swapped out; the other child is shared.
    /// Operands have no children and yield `None`.
    pub fn with_child(&self, branch: Branch, child: AstNode) -> Option<AstNode> {
        let mut node = self.clone();
        match &mut node {
            AstNode::Logical { left, right, .. } | AstNode::Comparison { left, right, .. } => {
                let slot = match branch {
                    Branch::Left => left,
                    Branch::Right => right,
                };
                *slot = Arc::new(child);
                Some(node)
            }
            AstNode::Operand { .. } => None,
        }
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, AstNode::Operand { .. })
    }

    /// Total number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            AstNode::Logical { left, right, .. } | AstNode::Comparison { left, right, .. } => {
                1 + left.node_count() + right.node_count()
            }
            AstNode::Operand { .. } => 1,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            AstNode::Logical { left, right, .. } | AstNode::Comparison { left, right, .. } => {
                1 + left.depth().max(right.depth())
            }
            AstNode::Operand { .. } => 1,
        }
    }

    /// Decode the JSON wire form, reporting unknown node kinds and operators.
    /// Trees deeper than [`MAX_DEPTH`] are rejected with `TooDeep`.
    pub fn from_json(json: &str) -> Result<AstNode> {
        let wire: WireNode = serde_json::from_str(json)?;
        AstNode::try_from(wire)
    }

    pub fn from_json_value(json: serde_json::Value) -> Result<AstNode> {
        let wire: WireNode = serde_json::from_value(json)?;
        AstNode::try_from(wire)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Untyped storage shape: `{type, operator?, left?, right?, value?}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireNode {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left: Option<Box<WireNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right: Option<Box<WireNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl WireNode {
    fn take_children(&mut self, level: usize) -> Result<(AstNode, AstNode)> {
        let left = self.left.take().ok_or_else(|| {
            RuleEngineError::Deserialization(format!("{} node without left child", self.node_type))
        })?;
        let right = self.right.take().ok_or_else(|| {
            RuleEngineError::Deserialization(format!("{} node without right child", self.node_type))
        })?;
        Ok((decode(*left, level + 1)?, decode(*right, level + 1)?))
    }

    fn operator_text(&self) -> Result<&str> {
        self.operator.as_deref().ok_or_else(|| {
            RuleEngineError::Deserialization(format!("{} node without operator", self.node_type))
        })
    }
}

impl TryFrom<WireNode> for AstNode {
    type Error = RuleEngineError;

    fn try_from(wire: WireNode) -> Result<AstNode> {
        decode(wire, 1)
    }
}

/// Convert one wire node sitting `level` levels below the root (root = 1)
fn decode(mut wire: WireNode, level: usize) -> Result<AstNode> {
    check_depth(level)?;
    match wire.node_type.as_str() {
        "logical" => {
            let operator = wire.operator_text()?.parse::<LogicalOperator>()?;
            let (left, right) = wire.take_children(level)?;
            Ok(AstNode::logical(operator, left, right))
        }
        "comparison" => {
            let operator = wire.operator_text()?.parse::<ComparisonOperator>()?;
            let (left, right) = wire.take_children(level)?;
            Ok(AstNode::comparison(operator, left, right))
        }
        "operand" => {
            let value = wire.value.take().ok_or_else(|| {
                RuleEngineError::Deserialization("operand node without value".to_string())
            })?;
            Ok(AstNode::Operand { value })
        }
        other => Err(RuleEngineError::UnsupportedNode(other.to_string())),
    }
}

impl From<AstNode> for WireNode {
    fn from(node: AstNode) -> WireNode {
        WireNode::from(&node)
    }
}

impl From<&AstNode> for WireNode {
    fn from(node: &AstNode) -> WireNode {
        match node {
            AstNode::Logical { left, right, .. } | AstNode::Comparison { left, right, .. } => {
                WireNode {
                    node_type: node.kind().to_string(),
                    operator: node.operator().map(str::to_string),
                    left: Some(Box::new(WireNode::from(left.as_ref()))),
                    right: Some(Box::new(WireNode::from(right.as_ref()))),
                    value: None,
                }
            }
            AstNode::Operand { value } => WireNode {
                node_type: node.kind().to_string(),
                operator: None,
                left: None,
                right: None,
                value: Some(value.clone()),
            },
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn age_over_30() -> AstNode {
        AstNode::comparison(
            ComparisonOperator::Greater,
            AstNode::operand("age"),
            AstNode::operand(30),
        )
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("and".parse::<LogicalOperator>().unwrap(), LogicalOperator::And);
        assert_eq!(" Or ".parse::<LogicalOperator>().unwrap(), LogicalOperator::Or);
        assert_eq!("=".parse::<ComparisonOperator>().unwrap(), ComparisonOperator::Equal);
        assert_eq!(">=".parse::<ComparisonOperator>().unwrap(), ComparisonOperator::GreaterEqual);
        assert!(matches!(
            "XOR".parse::<LogicalOperator>(),
            Err(RuleEngineError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            "!=".parse::<ComparisonOperator>(),
            Err(RuleEngineError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(age_over_30()).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "comparison",
                "operator": ">",
                "left": {"type": "operand", "value": "age"},
                "right": {"type": "operand", "value": 30.0}
            })
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "type": "logical",
            "operator": "and",
            "left": {"type": "comparison", "operator": ">", "left": {"type": "operand", "value": "age"}, "right": {"type": "operand", "value": 30}},
            "right": {"type": "operand", "value": true}
        }"#;
        let ast = AstNode::from_json(json).unwrap();
        match &ast {
            AstNode::Logical { operator, left, right } => {
                assert_eq!(*operator, LogicalOperator::And);
                assert_eq!(left.as_ref(), &age_over_30());
                assert_eq!(right.as_ref(), &AstNode::operand(true));
            }
            _ => panic!("Expected logical node"),
        }
        assert_eq!(AstNode::from_json(&ast.to_json().unwrap()).unwrap(), ast);
    }

    #[test]
    fn test_from_json_rejects_unknown_kind_and_operator() {
        let err = AstNode::from_json(r#"{"type": "unary", "value": 1}"#).unwrap_err();
        assert_eq!(err, RuleEngineError::UnsupportedNode("unary".to_string()));

        let err = AstNode::from_json(
            r#"{"type": "comparison", "operator": "!=",
                "left": {"type": "operand", "value": "age"},
                "right": {"type": "operand", "value": 1}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleEngineError::UnsupportedOperator(_)));

        let err = AstNode::from_json(r#"{"type": "logical", "operator": "AND"}"#).unwrap_err();
        assert!(matches!(err, RuleEngineError::Deserialization(_)));
    }

    /// Left-leaning AND chain of `comparisons` tests, `comparisons + 1` levels deep
    fn and_chain(comparisons: usize) -> AstNode {
        (1..comparisons).fold(age_over_30(), |acc, _| {
            AstNode::logical(LogicalOperator::And, acc, age_over_30())
        })
    }

    #[test]
    fn test_from_json_depth_limit() {
        let deepest = and_chain(MAX_DEPTH - 1);
        assert_eq!(deepest.depth(), MAX_DEPTH);
        assert_eq!(AstNode::from_json(&deepest.to_json().unwrap()).unwrap(), deepest);

        let too_deep = and_chain(MAX_DEPTH);
        let err = AstNode::from_json(&too_deep.to_json().unwrap()).unwrap_err();
        assert_eq!(err, RuleEngineError::TooDeep(MAX_DEPTH));

        let value = serde_json::to_value(&too_deep).unwrap();
        let err = AstNode::from_json_value(value).unwrap_err();
        assert_eq!(err, RuleEngineError::TooDeep(MAX_DEPTH));
    }

    #[test]
    fn test_with_child_shares_sibling() {
        let ast = age_over_30();
        let updated = ast.with_child(Branch::Right, AstNode::operand(40)).unwrap();
        assert!(Arc::ptr_eq(
            ast.child(Branch::Left).unwrap(),
            updated.child(Branch::Left).unwrap()
        ));
        assert_eq!(updated.child(Branch::Right).unwrap().as_ref(), &AstNode::operand(40));
        assert!(AstNode::operand(1).with_child(Branch::Left, AstNode::operand(2)).is_none());
    }

    #[test]
    fn test_counts() {
        let ast = AstNode::logical(LogicalOperator::Or, age_over_30(), AstNode::operand(false));
        assert_eq!(ast.node_count(), 5);
        assert_eq!(ast.depth(), 3);
        assert_eq!(ast.kind(), "logical");
        assert_eq!(ast.operator(), Some("OR"));
    }
}
