//! Scalar values carried by operand nodes and data records

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar: number, string or boolean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    /// Numeric view used by ordering and loose equality.
    /// Booleans become 1/0, strings go through [`parse_number`].
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::String(s) => parse_number(s),
        }
    }

    /// Truth value of a scalar in boolean position
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }
}

/// Read a string as a number the way loosely typed rules expect.
///
/// Surrounding whitespace is ignored and a blank string is 0. Accepts
/// decimal and exponent forms, unsigned `0x`/`0o`/`0b` integers and the exact
/// spelling `Infinity` with an optional sign. Anything else is NaN.
pub fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix_digits(&trimmed[2..], radix);
    }

    // f64::from_str also takes "inf", "nan" and friends
    let decimal = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !decimal {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix_digits(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            // Integral numbers print without a fractional part
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::from(30).to_string(), "30");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from("HR").to_string(), "HR");
        assert_eq!(Value::from(true).to_string(), "true");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 30 ").to_number(), 30.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("HR").to_number().is_nan());
        assert_eq!(Value::from(true).to_number(), 1.0);
    }

    #[test]
    fn test_string_coercion_table() {
        let cases: [(&str, f64); 14] = [
            (" 1e3 ", 1000.0),
            ("", 0.0),
            ("\t\n", 0.0),
            ("-2.5", -2.5),
            ("+7", 7.0),
            (".5", 0.5),
            ("5.", 5.0),
            ("0x10", 16.0),
            ("0XfF", 255.0),
            ("0o17", 15.0),
            ("0b101", 5.0),
            ("Infinity", f64::INFINITY),
            ("+Infinity", f64::INFINITY),
            ("-Infinity", f64::NEG_INFINITY),
        ];
        for (text, expected) in cases {
            assert_eq!(Value::from(text).to_number(), expected, "for {:?}", text);
        }

        let not_numbers = [
            "inf", "+inf", "-INF", "infinity", "INFINITY", "nan", "NaN", "0x", "-0x10", "0b102",
            "0o8", "1_000", "12abc", "1 2", "HR",
        ];
        for text in not_numbers {
            assert!(Value::from(text).to_number().is_nan(), "for {:?}", text);
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::from("x").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from(-1).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
    }

    #[test]
    fn test_untagged_serde() {
        let values: Vec<Value> = serde_json::from_str(r#"[30, "HR", false, 1.5]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::from(30),
                Value::from("HR"),
                Value::from(false),
                Value::from(1.5)
            ]
        );
        assert_eq!(serde_json::to_string(&Value::from("HR")).unwrap(), r#""HR""#);
    }
}
