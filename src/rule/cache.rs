//! Parsed rule cache keyed by rule string (default catalog only)
//!
//! Rule strings arrive from callers, so the cache is bounded: once it holds
//! `capacity` rules, the next new rule empties it before being stored.

use crate::error::Result;
use crate::rule::ast::AstNode;
use crate::rule::evaluator::{evaluate, Record};
use crate::rule::parser;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Rules kept by the process-wide cache before it starts over
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Global rule cache with fast hashing (ahash)
static RULE_CACHE: Lazy<RuleCache> = Lazy::new(|| RuleCache::new(DEFAULT_CACHE_CAPACITY));

/// Bounded map from rule string to its parsed tree
#[derive(Debug)]
pub struct RuleCache {
    entries: RwLock<AHashMap<String, AstNode>>,
    capacity: usize,
}

impl RuleCache {
    /// A cache holding at most `capacity` rules; 0 disables caching
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(AHashMap::with_capacity(capacity.min(256))),
            capacity,
        }
    }

    /// Get or parse a rule string. Cloning a cached tree only bumps
    /// reference counts.
    pub fn get_or_parse(&self, rule: &str) -> Result<AstNode> {
        // Fast path: check read lock first
        {
            let entries = self.entries.read();
            if let Some(ast) = entries.get(rule) {
                return Ok(ast.clone());
            }
        }

        // Slow path: parse and cache
        let ast = parser::parse(rule)?;
        if self.capacity == 0 {
            return Ok(ast);
        }

        {
            let mut entries = self.entries.write();
            if entries.len() >= self.capacity && !entries.contains_key(rule) {
                log::debug!("rule cache full at {} entries, starting over", entries.len());
                entries.clear();
            }
            entries.insert(rule.to_string(), ast.clone());
        }

        Ok(ast)
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.entries.read().contains_key(rule)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Get or parse a rule string through the process-wide cache
#[inline]
pub fn get_or_parse(rule: &str) -> Result<AstNode> {
    RULE_CACHE.get_or_parse(rule)
}

/// Evaluate a rule string against a record, using the cached AST.
/// A blank rule has no tree and evaluates to `false`.
#[inline]
pub fn check_rule(rule: &str, record: &Record) -> Result<bool> {
    if rule.trim().is_empty() {
        return Ok(evaluate(None, record));
    }

    let ast = get_or_parse(rule)?;
    Ok(evaluate(Some(&ast), record))
}

/// Clear the process-wide rule cache
pub fn clear_cache() {
    RULE_CACHE.clear();
}

/// Number of rules in the process-wide cache
pub fn cache_size() -> usize {
    RULE_CACHE.len()
}
