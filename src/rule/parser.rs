//! Rule string parser
//!
//! Grammar, lowest precedence first, every level left-associative:
//!
//! ```text
//! or         := and ("OR" and)*
//! and        := comparison ("AND" comparison)*
//! comparison := primary ((">" | ">=" | "<" | "<=" | "==" | "=") primary)*
//! primary    := number | string | boolean | identifier | "(" or ")"
//! ```
//!
//! Identifiers must name catalog attributes, except on the right of
//! `attribute == word` where an unknown word is read as a string literal.
//! Parentheses may nest, and the resulting tree may reach, at most
//! [`MAX_DEPTH`](crate::rule::MAX_DEPTH) levels.

use crate::error::{Result, RuleEngineError};
use crate::rule::ast::{check_depth, AstNode, ComparisonOperator, LogicalOperator};
use crate::rule::catalog::AttributeCatalog;
use crate::rule::value::Value;
use std::fmt;

/// Parse a rule string against the default attribute catalog
pub fn parse(rule: &str) -> Result<AstNode> {
    parse_with_catalog(rule, AttributeCatalog::global())
}

/// Parse a rule string, checking identifiers against `catalog`
pub fn parse_with_catalog(rule: &str, catalog: &AttributeCatalog) -> Result<AstNode> {
    let rule = rule.trim();
    if rule.is_empty() {
        return Err(RuleEngineError::Parse("Empty rule string".to_string()));
    }

    let tokens = tokenize(rule)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        catalog,
        nesting: 0,
    };
    let (ast, _) = parser.parse_or()?;

    if let Some(spanned) = parser.peek() {
        return Err(RuleEngineError::Parse(format!(
            "Unexpected {} at character {}",
            spanned.token, spanned.offset
        )));
    }

    log::trace!("parsed rule {:?} into {} nodes", rule, ast.node_count());
    Ok(ast)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Bool(bool),
    Ident(String),
    And,
    Or,
    Compare(ComparisonOperator),
    OpenParen,
    CloseParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", Value::Number(*n)),
            Token::Str(s) => write!(f, "string {:?}", s),
            Token::Bool(b) => write!(f, "boolean {}", b),
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
            Token::Compare(op) => write!(f, "operator '{}'", op),
            Token::OpenParen => f.write_str("'('"),
            Token::CloseParen => f.write_str("')'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn tokenize(rule: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = rule.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => {
                chars.next();
                Token::OpenParen
            }
            ')' => {
                chars.next();
                Token::CloseParen
            }
            '>' | '<' | '=' => {
                chars.next();
                let with_eq = chars.next_if(|&(_, next)| next == '=').is_some();
                let op = match (c, with_eq) {
                    ('>', false) => ComparisonOperator::Greater,
                    ('>', true) => ComparisonOperator::GreaterEqual,
                    ('<', false) => ComparisonOperator::Less,
                    ('<', true) => ComparisonOperator::LessEqual,
                    // "=" is an alias of "=="
                    _ => ComparisonOperator::Equal,
                };
                Token::Compare(op)
            }
            '"' | '\'' => {
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some((_, ch)) if ch == c => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => literal.push('\n'),
                            Some((_, 't')) => literal.push('\t'),
                            Some((_, 'r')) => literal.push('\r'),
                            Some((_, esc @ ('\\' | '"' | '\''))) => literal.push(esc),
                            Some((at, esc)) => {
                                return Err(RuleEngineError::Parse(format!(
                                    "Invalid escape sequence \\{} at character {}",
                                    esc, at
                                )))
                            }
                            None => {
                                return Err(RuleEngineError::Parse(format!(
                                    "Unterminated string starting at character {}",
                                    offset
                                )))
                            }
                        },
                        Some((_, ch)) => literal.push(ch),
                        None => {
                            return Err(RuleEngineError::Parse(format!(
                                "Unterminated string starting at character {}",
                                offset
                            )))
                        }
                    }
                }
                Token::Str(literal)
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' => {
                let mut text = String::new();
                text.push(c);
                chars.next();
                while let Some((_, next)) = chars.next_if(|&(_, n)| {
                    n.is_ascii_digit() || n == '.' || n == 'e' || n == 'E'
                }) {
                    text.push(next);
                    // exponent sign
                    if matches!(next, 'e' | 'E') {
                        if let Some((_, sign)) = chars.next_if(|&(_, n)| n == '+' || n == '-') {
                            text.push(sign);
                        }
                    }
                }
                let number = text
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| {
                        RuleEngineError::Parse(format!(
                            "Invalid number '{}' at character {}",
                            text, offset
                        ))
                    })?;
                Token::Number(number)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some((_, next)) = chars.next_if(|&(_, n)| n.is_alphanumeric() || n == '_')
                {
                    word.push(next);
                }
                if word.eq_ignore_ascii_case("and") {
                    Token::And
                } else if word.eq_ignore_ascii_case("or") {
                    Token::Or
                } else if word.eq_ignore_ascii_case("true") {
                    Token::Bool(true)
                } else if word.eq_ignore_ascii_case("false") {
                    Token::Bool(false)
                } else {
                    Token::Ident(word)
                }
            }
            other => {
                return Err(RuleEngineError::Parse(format!(
                    "Unexpected character '{}' at character {}",
                    other, offset
                )))
            }
        };
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

/// Where an operand sits, which decides how a bare word is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandRole {
    /// Anywhere a bare word must name an attribute
    Subject,
    /// Right side of `attribute == ...`: unknown bare words are string literals
    EqualityValue,
}

/// A parsed subtree and its depth
type Parsed = (AstNode, usize);

/// Join two subtrees under a new node, refusing trees that grow too deep
fn join(
    left: Parsed,
    right: Parsed,
    build: impl FnOnce(AstNode, AstNode) -> AstNode,
) -> Result<Parsed> {
    let depth = left.1.max(right.1) + 1;
    check_depth(depth)?;
    Ok((build(left.0, right.0), depth))
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    catalog: &'a AttributeCatalog,
    /// Open parentheses around the current position
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Spanned> {
        let spanned = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(spanned)
    }

    fn eat(&mut self, token: &Token) -> bool {
        match self.peek() {
            Some(spanned) if &spanned.token == token => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn is_attribute(&self, node: &AstNode) -> bool {
        match node {
            AstNode::Operand {
                value: Value::String(name),
            } => self.catalog.contains(name),
            _ => false,
        }
    }

    fn parse_or(&mut self) -> Result<Parsed> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = join(left, right, |l, r| AstNode::logical(LogicalOperator::Or, l, r))?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Parsed> {
        let mut left = self.parse_comparison()?;
        while self.eat(&Token::And) {
            let right = self.parse_comparison()?;
            left = join(left, right, |l, r| AstNode::logical(LogicalOperator::And, l, r))?;
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Parsed> {
        let mut left = self.parse_primary(OperandRole::Subject)?;
        while let Some(Spanned {
            token: Token::Compare(op),
            ..
        }) = self.peek()
        {
            self.pos += 1;
            let role = if *op == ComparisonOperator::Equal && self.is_attribute(&left.0) {
                OperandRole::EqualityValue
            } else {
                OperandRole::Subject
            };
            let right = self.parse_primary(role)?;
            left = join(left, right, |l, r| AstNode::comparison(*op, l, r))?;
        }
        Ok(left)
    }

    fn parse_primary(&mut self, role: OperandRole) -> Result<Parsed> {
        let spanned = self
            .next()
            .ok_or_else(|| RuleEngineError::Parse("Unexpected end of rule string".to_string()))?;

        match &spanned.token {
            Token::Number(n) => Ok((AstNode::operand(*n), 1)),
            Token::Str(s) => Ok((AstNode::operand(s.as_str()), 1)),
            Token::Bool(b) => Ok((AstNode::operand(*b), 1)),
            Token::Ident(name) => {
                if self.catalog.contains(name) || role == OperandRole::EqualityValue {
                    Ok((AstNode::operand(name.as_str()), 1))
                } else {
                    Err(RuleEngineError::UnknownAttribute(name.clone()))
                }
            }
            Token::OpenParen => {
                self.nesting += 1;
                check_depth(self.nesting)?;
                let inner = self.parse_or()?;
                self.nesting -= 1;
                if self.eat(&Token::CloseParen) {
                    Ok(inner)
                } else {
                    Err(RuleEngineError::Parse(format!(
                        "Unclosed '(' at character {}",
                        spanned.offset
                    )))
                }
            }
            other => Err(RuleEngineError::Parse(format!(
                "Unexpected {} at character {}",
                other, spanned.offset
            ))),
        }
    }
}
