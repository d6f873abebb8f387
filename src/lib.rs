//! Rule AST Core - eligibility rule engine
//!
//! Parses rule strings such as `age > 30 AND department == "HR"` into ASTs,
//! edits them by positional path, combines several rules into one and
//! evaluates them against data records. A named in-memory registry and
//! optional Python bindings (feature `python`) sit on top of the engine.

pub mod error;
pub mod registry;
pub mod rule;

#[cfg(feature = "python")]
mod python;

pub use error::{Result, RuleEngineError};
pub use registry::{RuleKind, RuleRegistry, StoredRule};
pub use rule::{
    add_sub_expression, combine, evaluate, get_operator, parse, parse_with_catalog,
    remove_sub_expression, replace, resolve, set_operand, set_operator, AstNode,
    AttributeCatalog, Branch, ComparisonOperator, LogicalOperator, NodePath, Record, Value,
    MAX_DEPTH,
};
