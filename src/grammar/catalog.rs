//! Process-Wide Grammar Catalog
//!
//!     Compiled grammars are published here under their name so that rules in one
//!     grammar can reach another by reference (cross-grammar includes, delegate
//!     regions). The catalog is the only shared mutable state in the engine: it is
//!     written by grammar registration and read by every scope stack machine.
//!
//!     Updates are atomic per name: registration swaps the `Arc` under a write lock,
//!     so a reader sees either the old grammar or the new one, never a partial
//!     replacement. Frames of open documents keep the `Arc` they resolved earlier and
//!     pick up a replacement the next time the affected lines re-tokenize.

use crate::grammar::Grammar;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

static CATALOG: Lazy<RwLock<HashMap<String, Arc<Grammar>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Publish a grammar under its name, replacing any prior entry (last-loaded
/// wins). Returns the replaced grammar, if there was one.
pub fn register(grammar: Arc<Grammar>) -> Option<Arc<Grammar>> {
    let mut map = CATALOG.write().unwrap_or_else(PoisonError::into_inner);
    debug!(grammar = %grammar.name(), "registering grammar");
    map.insert(grammar.name().to_string(), grammar)
}

/// Look up a grammar by name.
pub fn lookup(name: &str) -> Option<Arc<Grammar>> {
    let map = CATALOG.read().unwrap_or_else(PoisonError::into_inner);
    map.get(name).cloned()
}

/// Names of all registered grammars, in no particular order.
pub fn names() -> Vec<String> {
    let map = CATALOG.read().unwrap_or_else(PoisonError::into_inner);
    map.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{compile, grammar_def, match_rule};

    #[test]
    fn test_register_and_lookup() {
        let grammar = compile(grammar_def("catalog-basic", "", vec![]));
        assert!(register(grammar.clone()).is_none());
        let found = lookup("catalog-basic").expect("registered grammar");
        assert!(Arc::ptr_eq(&grammar, &found));
    }

    #[test]
    fn test_lookup_missing_name() {
        assert!(lookup("catalog-never-registered").is_none());
    }

    #[test]
    fn test_register_replaces_prior_entry() {
        let first = compile(grammar_def("catalog-replace", "", vec![]));
        let second = compile(grammar_def(
            "catalog-replace",
            "",
            vec![match_rule(r"\d+", "number")],
        ));
        register(first.clone());
        let replaced = register(second.clone()).expect("first registration");
        assert!(Arc::ptr_eq(&replaced, &first));
        let found = lookup("catalog-replace").expect("registered grammar");
        assert!(Arc::ptr_eq(&found, &second));
    }

    #[test]
    fn test_names_contains_registered() {
        register(compile(grammar_def("catalog-names", "", vec![])));
        assert!(names().iter().any(|n| n == "catalog-names"));
    }
}
