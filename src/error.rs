//! Error types for the rule engine

use thiserror::Error;

/// Main error type for the rule engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleEngineError {
    #[error("Invalid rule string: {0}")]
    Parse(String),

    #[error("Invalid attribute: '{0}' is not in the catalog")]
    UnknownAttribute(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid operand value: {0}")]
    InvalidValue(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unsupported AST node type: {0}")]
    UnsupportedNode(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Rule nests too deeply: more than {0} levels")]
    TooDeep(usize),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Rule with this name already exists: {0}")]
    DuplicateRule(String),
}

impl From<serde_json::Error> for RuleEngineError {
    fn from(err: serde_json::Error) -> Self {
        RuleEngineError::Deserialization(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<RuleEngineError> for pyo3::PyErr {
    fn from(err: RuleEngineError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyKeyError, PyValueError};

        match err {
            RuleEngineError::RuleNotFound(_) | RuleEngineError::NodeNotFound(_) => {
                PyKeyError::new_err(err.to_string())
            }
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Result type alias for the rule engine
pub type Result<T> = std::result::Result<T, RuleEngineError>;
