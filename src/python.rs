//! Python bindings
//!
//! ASTs cross the boundary as JSON strings in the wire form
//! `{type, operator?, left?, right?, value?}`; records are plain dicts of
//! `bool | int | float | str`; paths are either `"left.right"` or
//! `["left", "right"]`.

use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict};

use crate::error::RuleEngineError;
use crate::registry::{self, RuleKind, StoredRule};
use crate::rule::{self, AstNode, NodePath, Record, Value};

// ============================================================================
// Helper Functions
// ============================================================================

fn extract_value(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    // bool is a subclass of int, test it first
    if obj.is_instance_of::<PyBool>() {
        return Ok(Value::Bool(obj.extract()?));
    }
    if let Ok(s) = obj.extract::<String>() {
        return Ok(Value::String(s));
    }
    if let Ok(n) = obj.extract::<f64>() {
        return Ok(Value::Number(n));
    }
    Err(PyTypeError::new_err(format!(
        "Unsupported value type: {}",
        obj.get_type().name()?
    )))
}

/// Operand values end up in JSON trees, which have no NaN or infinity
fn extract_operand(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    match extract_value(obj)? {
        Value::Number(n) if !n.is_finite() => Err(PyValueError::new_err(format!(
            "Invalid operand value: {} is not a finite number",
            n
        ))),
        value => Ok(value),
    }
}

fn extract_record(data: &Bound<'_, PyDict>) -> PyResult<Record> {
    let mut record = Record::with_capacity(data.len());
    for (key, value) in data.iter() {
        let key: String = key.extract()?;
        record.insert(key, extract_value(&value)?);
    }
    Ok(record)
}

fn extract_path(obj: &Bound<'_, PyAny>) -> PyResult<NodePath> {
    if let Ok(dotted) = obj.extract::<String>() {
        return Ok(dotted.parse::<NodePath>()?);
    }
    let segments: Vec<String> = obj.extract()?;
    Ok(NodePath::from_segments(segments)?)
}

fn kind_of(combined: bool) -> RuleKind {
    if combined {
        RuleKind::Combined
    } else {
        RuleKind::Single
    }
}

fn to_json(ast: &AstNode) -> PyResult<String> {
    Ok(ast.to_json()?)
}

fn rule_to_json(rule: &StoredRule) -> PyResult<String> {
    serde_json::to_string(rule).map_err(|e| RuleEngineError::from(e).into())
}

// ============================================================================
// Engine Functions
// ============================================================================

/// Parse a rule string into its JSON AST
///
/// # Raises
/// ValueError on bad syntax or an attribute outside the catalog
#[pyfunction]
fn parse_rule(rule_string: &str) -> PyResult<String> {
    to_json(&rule::parse(rule_string)?)
}

/// Render a JSON AST back into a rule string
#[pyfunction]
fn render_rule(ast_json: &str) -> PyResult<String> {
    Ok(AstNode::from_json(ast_json)?.to_string())
}

/// Parse several rule strings and join them with one logical operator.
/// Returns None for an empty list.
#[pyfunction]
#[pyo3(signature = (rule_strings, operator="AND"))]
fn combine_rules(rule_strings: Vec<String>, operator: &str) -> PyResult<Option<String>> {
    let asts = rule_strings
        .iter()
        .map(|s| rule::parse(s))
        .collect::<crate::error::Result<Vec<_>>>()?;
    rule::combine(asts, operator)?
        .as_ref()
        .map(to_json)
        .transpose()
}

/// Evaluate a JSON AST against a dict. A missing AST is False.
#[pyfunction]
#[pyo3(signature = (ast_json, data))]
fn evaluate_rule(ast_json: Option<&str>, data: &Bound<'_, PyDict>) -> PyResult<bool> {
    let record = extract_record(data)?;
    match ast_json {
        Some(json) => Ok(rule::evaluate_json(json, &record)?),
        None => Ok(rule::evaluate(None, &record)),
    }
}

/// Evaluate a rule string directly, reusing previously parsed rules
#[pyfunction]
fn check_rule(rule_string: &str, data: &Bound<'_, PyDict>) -> PyResult<bool> {
    let record = extract_record(data)?;
    Ok(rule::check_rule(rule_string, &record)?)
}

/// Drop every cached parse result
#[pyfunction]
fn clear_rule_cache() {
    rule::clear_cache();
}

#[pyfunction]
fn get_operator(ast_json: &str, path: &Bound<'_, PyAny>) -> PyResult<String> {
    let ast = AstNode::from_json(ast_json)?;
    Ok(rule::get_operator(&ast, &extract_path(path)?)?.to_string())
}

/// Return a copy of the AST with the operator at `path` replaced
#[pyfunction]
fn modify_operator(ast_json: &str, path: &Bound<'_, PyAny>, new_operator: &str) -> PyResult<String> {
    let ast = AstNode::from_json(ast_json)?;
    to_json(&rule::set_operator(&ast, &extract_path(path)?, new_operator)?)
}

/// Return a copy of the AST with the operand value at `path` replaced
#[pyfunction]
fn modify_operand(
    ast_json: &str,
    path: &Bound<'_, PyAny>,
    new_value: &Bound<'_, PyAny>,
) -> PyResult<String> {
    let ast = AstNode::from_json(ast_json)?;
    let value = extract_operand(new_value)?;
    to_json(&rule::set_operand(&ast, &extract_path(path)?, value)?)
}

/// Parse `expression` and join it onto the node at `path`
#[pyfunction]
#[pyo3(signature = (ast_json, path, expression, operator=None))]
fn add_sub_expression(
    ast_json: &str,
    path: &Bound<'_, PyAny>,
    expression: &str,
    operator: Option<&str>,
) -> PyResult<String> {
    let ast = AstNode::from_json(ast_json)?;
    let sub = rule::parse(expression)?;
    to_json(&rule::add_sub_expression(&ast, &extract_path(path)?, sub, operator)?)
}

#[pyfunction]
fn remove_sub_expression(ast_json: &str, path: &Bound<'_, PyAny>) -> PyResult<String> {
    let ast = AstNode::from_json(ast_json)?;
    to_json(&rule::remove_sub_expression(&ast, &extract_path(path)?)?)
}

// ============================================================================
// Registry Functions
// ============================================================================

/// Store a named rule; returns the stored rule as JSON
///
/// # Raises
/// ValueError if the name is taken or the rule does not parse
#[pyfunction]
fn create_rule(name: &str, rule_string: &str) -> PyResult<String> {
    rule_to_json(&registry::global().create_rule(name, rule_string)?)
}

#[pyfunction]
#[pyo3(signature = (name, rule_strings, operator="AND"))]
fn create_combined_rule(name: &str, rule_strings: Vec<String>, operator: &str) -> PyResult<String> {
    rule_to_json(&registry::global().create_combined_rule(name, rule_strings.as_slice(), operator)?)
}

/// Fetch a stored rule as JSON
///
/// # Raises
/// KeyError if no rule has that name
#[pyfunction]
#[pyo3(signature = (name, combined=false))]
fn get_rule(name: &str, combined: bool) -> PyResult<String> {
    rule_to_json(&registry::global().get(kind_of(combined), name)?)
}

#[pyfunction]
#[pyo3(signature = (combined=false))]
fn list_rules(combined: bool) -> Vec<String> {
    registry::global().names(kind_of(combined))
}

#[pyfunction]
#[pyo3(signature = (name, data, combined=false))]
fn evaluate_by_name(name: &str, data: &Bound<'_, PyDict>, combined: bool) -> PyResult<bool> {
    let record = extract_record(data)?;
    Ok(registry::global().evaluate(kind_of(combined), name, &record)?)
}

/// Replace the stored AST of a rule
#[pyfunction]
#[pyo3(signature = (name, ast_json, combined=false))]
fn save_rule(name: &str, ast_json: Option<&str>, combined: bool) -> PyResult<String> {
    let ast = ast_json.map(AstNode::from_json).transpose()?;
    rule_to_json(&registry::global().save(kind_of(combined), name, ast)?)
}

#[pyfunction]
#[pyo3(signature = (name, combined=false))]
fn remove_rule(name: &str, combined: bool) -> PyResult<String> {
    rule_to_json(&registry::global().remove(kind_of(combined), name)?)
}

#[pyfunction]
#[pyo3(signature = (name, path, new_operator, combined=false))]
fn edit_rule_operator(
    name: &str,
    path: &Bound<'_, PyAny>,
    new_operator: &str,
    combined: bool,
) -> PyResult<String> {
    let path = extract_path(path)?;
    rule_to_json(&registry::global().modify_operator(kind_of(combined), name, &path, new_operator)?)
}

#[pyfunction]
#[pyo3(signature = (name, path, new_value, combined=false))]
fn edit_rule_operand(
    name: &str,
    path: &Bound<'_, PyAny>,
    new_value: &Bound<'_, PyAny>,
    combined: bool,
) -> PyResult<String> {
    let path = extract_path(path)?;
    let value = extract_operand(new_value)?;
    rule_to_json(&registry::global().modify_operand(kind_of(combined), name, &path, value)?)
}

#[pyfunction]
#[pyo3(signature = (name, path, expression, operator=None, combined=false))]
fn edit_rule_add_sub_expression(
    name: &str,
    path: &Bound<'_, PyAny>,
    expression: &str,
    operator: Option<&str>,
    combined: bool,
) -> PyResult<String> {
    let path = extract_path(path)?;
    rule_to_json(&registry::global().add_sub_expression(
        kind_of(combined),
        name,
        &path,
        expression,
        operator,
    )?)
}

#[pyfunction]
#[pyo3(signature = (name, path, combined=false))]
fn edit_rule_remove_sub_expression(
    name: &str,
    path: &Bound<'_, PyAny>,
    combined: bool,
) -> PyResult<String> {
    let path = extract_path(path)?;
    rule_to_json(&registry::global().remove_sub_expression(kind_of(combined), name, &path)?)
}

// ============================================================================
// Python Module Definition
// ============================================================================

/// Python module definition
#[pymodule]
fn rule_ast_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse_rule, m)?)?;
    m.add_function(wrap_pyfunction!(render_rule, m)?)?;
    m.add_function(wrap_pyfunction!(combine_rules, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_rule, m)?)?;
    m.add_function(wrap_pyfunction!(check_rule, m)?)?;
    m.add_function(wrap_pyfunction!(clear_rule_cache, m)?)?;
    m.add_function(wrap_pyfunction!(get_operator, m)?)?;
    m.add_function(wrap_pyfunction!(modify_operator, m)?)?;
    m.add_function(wrap_pyfunction!(modify_operand, m)?)?;
    m.add_function(wrap_pyfunction!(add_sub_expression, m)?)?;
    m.add_function(wrap_pyfunction!(remove_sub_expression, m)?)?;
    m.add_function(wrap_pyfunction!(create_rule, m)?)?;
    m.add_function(wrap_pyfunction!(create_combined_rule, m)?)?;
    m.add_function(wrap_pyfunction!(get_rule, m)?)?;
    m.add_function(wrap_pyfunction!(list_rules, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_by_name, m)?)?;
    m.add_function(wrap_pyfunction!(save_rule, m)?)?;
    m.add_function(wrap_pyfunction!(remove_rule, m)?)?;
    m.add_function(wrap_pyfunction!(edit_rule_operator, m)?)?;
    m.add_function(wrap_pyfunction!(edit_rule_operand, m)?)?;
    m.add_function(wrap_pyfunction!(edit_rule_add_sub_expression, m)?)?;
    m.add_function(wrap_pyfunction!(edit_rule_remove_sub_expression, m)?)?;
    Ok(())
}
