//! Attribute catalog - the allow-list of identifiers a rule string may reference

use ahash::AHashSet;
use once_cell::sync::Lazy;

/// Attributes known to the default catalog
pub const DEFAULT_ATTRIBUTES: [&str; 4] = ["age", "department", "salary", "experience"];

/// Process-wide default catalog
static DEFAULT_CATALOG: Lazy<AttributeCatalog> =
    Lazy::new(|| AttributeCatalog::new(DEFAULT_ATTRIBUTES));

/// Fixed set of attribute names, consulted only while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCatalog {
    names: AHashSet<String>,
}

impl AttributeCatalog {
    /// Build a catalog from any list of names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The shared default catalog
    #[inline]
    pub fn global() -> &'static AttributeCatalog {
        &DEFAULT_CATALOG
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Attribute names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AttributeCatalog {
    fn default() -> Self {
        DEFAULT_CATALOG.clone()
    }
}
