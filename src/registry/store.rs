//! In-memory store of named rules
//!
//! Single rules and combined rules live in separate namespaces. Every edit by
//! name runs as one read-modify-write under the namespace's write lock, so two
//! editors racing on the same rule cannot lose each other's change.

use crate::error::{Result, RuleEngineError};
use crate::rule::{
    self, combine, parse_with_catalog, AstNode, AttributeCatalog, LogicalOperator, NodePath,
    Record, Value,
};
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Which namespace a rule lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Built from one rule string
    Single,
    /// Built by combining several rule strings
    Combined,
}

impl RuleKind {
    fn label(&self) -> &'static str {
        match self {
            RuleKind::Single => "rule",
            RuleKind::Combined => "combined rule",
        }
    }
}

/// A named rule and its current tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRule {
    pub name: String,
    pub kind: RuleKind,
    /// Source strings the rule was created from
    pub rule_strings: Vec<String>,
    /// Join operator, combined rules only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<LogicalOperator>,
    /// `None` when a combined rule was created from no strings
    pub ast: Option<AstNode>,
}

impl StoredRule {
    /// Evaluate the stored tree against a record
    pub fn evaluate(&self, record: &Record) -> bool {
        rule::evaluate(self.ast.as_ref(), record)
    }
}

/// Named rule registry
#[derive(Debug, Default)]
pub struct RuleRegistry {
    catalog: AttributeCatalog,
    single: RwLock<AHashMap<String, StoredRule>>,
    combined: RwLock<AHashMap<String, StoredRule>>,
}

impl RuleRegistry {
    /// Registry parsing against the default catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry parsing against a custom catalog
    pub fn with_catalog(catalog: AttributeCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    fn namespace(&self, kind: RuleKind) -> &RwLock<AHashMap<String, StoredRule>> {
        match kind {
            RuleKind::Single => &self.single,
            RuleKind::Combined => &self.combined,
        }
    }

    fn insert(&self, rule: StoredRule) -> Result<StoredRule> {
        let mut rules = self.namespace(rule.kind).write();
        if rules.contains_key(&rule.name) {
            log::warn!("{} '{}' already exists", rule.kind.label(), rule.name);
            return Err(RuleEngineError::DuplicateRule(rule.name));
        }
        log::debug!("created {} '{}'", rule.kind.label(), rule.name);
        rules.insert(rule.name.clone(), rule.clone());
        Ok(rule)
    }

    /// Parse and store a single rule
    pub fn create_rule(&self, name: &str, rule_string: &str) -> Result<StoredRule> {
        let ast = parse_with_catalog(rule_string, &self.catalog)?;
        self.insert(StoredRule {
            name: name.to_string(),
            kind: RuleKind::Single,
            rule_strings: vec![rule_string.to_string()],
            operator: None,
            ast: Some(ast),
        })
    }

    /// Parse every string, combine them with `operator` and store the result
    pub fn create_combined_rule<S: AsRef<str>>(
        &self,
        name: &str,
        rule_strings: &[S],
        operator: &str,
    ) -> Result<StoredRule> {
        let asts = rule_strings
            .iter()
            .map(|s| parse_with_catalog(s.as_ref(), &self.catalog))
            .collect::<Result<Vec<_>>>()?;
        let join = operator.parse::<LogicalOperator>()?;
        let ast = combine(asts, join.as_str())?;
        self.insert(StoredRule {
            name: name.to_string(),
            kind: RuleKind::Combined,
            rule_strings: rule_strings.iter().map(|s| s.as_ref().to_string()).collect(),
            operator: Some(join),
            ast,
        })
    }

    /// Fetch a rule by name
    pub fn get(&self, kind: RuleKind, name: &str) -> Result<StoredRule> {
        self.namespace(kind)
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(kind, name))
    }

    pub fn contains(&self, kind: RuleKind, name: &str) -> bool {
        self.namespace(kind).read().contains_key(name)
    }

    /// Evaluate a stored rule against a record
    pub fn evaluate(&self, kind: RuleKind, name: &str, record: &Record) -> Result<bool> {
        let rules = self.namespace(kind).read();
        let rule = rules.get(name).ok_or_else(|| not_found(kind, name))?;
        Ok(rule.evaluate(record))
    }

    /// Replace the stored tree wholesale
    pub fn save(&self, kind: RuleKind, name: &str, ast: Option<AstNode>) -> Result<StoredRule> {
        let mut rules = self.namespace(kind).write();
        let rule = rules.get_mut(name).ok_or_else(|| not_found(kind, name))?;
        rule.ast = ast;
        log::debug!("saved {} '{}'", kind.label(), name);
        Ok(rule.clone())
    }

    pub fn modify_operator(
        &self,
        kind: RuleKind,
        name: &str,
        path: &NodePath,
        new_operator: &str,
    ) -> Result<StoredRule> {
        self.edit(kind, name, |ast| rule::set_operator(ast, path, new_operator))
    }

    pub fn modify_operand(
        &self,
        kind: RuleKind,
        name: &str,
        path: &NodePath,
        new_value: Value,
    ) -> Result<StoredRule> {
        self.edit(kind, name, |ast| rule::set_operand(ast, path, new_value))
    }

    /// Parse `expression` and graft it at `path`
    pub fn add_sub_expression(
        &self,
        kind: RuleKind,
        name: &str,
        path: &NodePath,
        expression: &str,
        operator: Option<&str>,
    ) -> Result<StoredRule> {
        let sub = parse_with_catalog(expression, &self.catalog)?;
        self.edit(kind, name, |ast| {
            rule::add_sub_expression(ast, path, sub, operator)
        })
    }

    pub fn remove_sub_expression(
        &self,
        kind: RuleKind,
        name: &str,
        path: &NodePath,
    ) -> Result<StoredRule> {
        self.edit(kind, name, |ast| rule::remove_sub_expression(ast, path))
    }

    /// Delete a rule, returning what was stored
    pub fn remove(&self, kind: RuleKind, name: &str) -> Result<StoredRule> {
        let removed = self
            .namespace(kind)
            .write()
            .remove(name)
            .ok_or_else(|| not_found(kind, name))?;
        log::debug!("removed {} '{}'", kind.label(), name);
        Ok(removed)
    }

    /// Rule names in sorted order
    pub fn names(&self, kind: RuleKind) -> Vec<String> {
        let mut names: Vec<String> = self.namespace(kind).read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self, kind: RuleKind) -> usize {
        self.namespace(kind).read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.single.read().is_empty() && self.combined.read().is_empty()
    }

    pub fn clear(&self) {
        self.single.write().clear();
        self.combined.write().clear();
    }

    fn edit<F>(&self, kind: RuleKind, name: &str, apply: F) -> Result<StoredRule>
    where
        F: FnOnce(&AstNode) -> Result<AstNode>,
    {
        let mut rules = self.namespace(kind).write();
        let rule = rules.get_mut(name).ok_or_else(|| not_found(kind, name))?;
        let current = rule.ast.as_ref().ok_or_else(|| {
            RuleEngineError::NodeNotFound(format!("{} '{}' has no expression", kind.label(), name))
        })?;
        let updated = apply(current)?;
        rule.ast = Some(updated);
        log::debug!("edited {} '{}'", kind.label(), name);
        Ok(rule.clone())
    }
}

fn not_found(kind: RuleKind, name: &str) -> RuleEngineError {
    RuleEngineError::RuleNotFound(format!("{} '{}'", kind.label(), name))
}
