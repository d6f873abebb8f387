//! Render an AST back into a rule string

use crate::rule::ast::AstNode;
use crate::rule::catalog::AttributeCatalog;
use crate::rule::value::Value;
use std::fmt::{self, Write};

impl AstNode {
    /// Fully parenthesized rule string. Strings naming a catalog attribute
    /// are written bare, every other string is quoted.
    pub fn to_rule_string(&self, catalog: &AttributeCatalog) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = write_node(&mut out, self, catalog);
        out
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self, AttributeCatalog::global())
    }
}

fn write_node<W: Write>(out: &mut W, node: &AstNode, catalog: &AttributeCatalog) -> fmt::Result {
    match node {
        AstNode::Logical { left, right, .. } | AstNode::Comparison { left, right, .. } => {
            out.write_char('(')?;
            write_node(out, left, catalog)?;
            write!(out, " {} ", node.operator().unwrap_or_default())?;
            write_node(out, right, catalog)?;
            out.write_char(')')
        }
        AstNode::Operand { value } => write_value(out, value, catalog),
    }
}

fn write_value<W: Write>(out: &mut W, value: &Value, catalog: &AttributeCatalog) -> fmt::Result {
    match value {
        Value::String(s) if catalog.contains(s) => out.write_str(s),
        Value::String(s) => {
            out.write_char('"')?;
            for c in s.chars() {
                match c {
                    '"' => out.write_str("\\\"")?,
                    '\\' => out.write_str("\\\\")?,
                    '\n' => out.write_str("\\n")?,
                    '\t' => out.write_str("\\t")?,
                    '\r' => out.write_str("\\r")?,
                    c => out.write_char(c)?,
                }
            }
            out.write_char('"')
        }
        other => write!(out, "{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parser::{parse, parse_with_catalog};

    #[test]
    fn test_render() {
        let ast = parse("age > 30 AND department = HR").unwrap();
        assert_eq!(ast.to_string(), r#"((age > 30) AND (department == "HR"))"#);
    }

    #[test]
    fn test_render_escapes_and_reparses() {
        let ast = parse(r#"department == "say \"hi\"\n" OR salary >= 1.5 OR age == false"#).unwrap();
        let rendered = ast.to_string();
        assert_eq!(parse(&rendered).unwrap(), ast);
    }

    #[test]
    fn test_render_with_custom_catalog() {
        let catalog = AttributeCatalog::new(["height"]);
        let ast = parse_with_catalog("height > 180", &catalog).unwrap();
        assert_eq!(ast.to_rule_string(&catalog), "(height > 180)");
        // Under the default catalog the name is just a string
        assert_eq!(ast.to_string(), r#"("height" > 180)"#);
    }
}
