//! Named rule registry
//!
//! Holds single and combined rules by name so that callers can create a rule
//! once and then edit or evaluate it by name.

mod store;

pub use store::*;

use once_cell::sync::Lazy;

/// Process-wide registry using the default catalog
static GLOBAL_REGISTRY: Lazy<RuleRegistry> = Lazy::new(RuleRegistry::new);

/// The shared registry
pub fn global() -> &'static RuleRegistry {
    &GLOBAL_REGISTRY
}
