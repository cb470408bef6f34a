//! Testing utilities
//!
//!     Factories for building rule-set documents in code, so tests construct grammars
//!     without going through a serialized document. Tests across the crate share these
//!     rather than hand-rolling `RuleDef` literals; a rule definition built two slightly
//!     different ways in two tests is how grammars drift from what the engine actually
//!     accepts.
//!
//!     The grammar catalog is process-wide and tests run in parallel, so every test
//!     registers grammars under names unique to that test (by convention prefixed with
//!     the test module's theme, e.g. `doc-converge`, `tok-keyword`).

use crate::grammar::definition::{GrammarDef, RuleDef};
use crate::grammar::{catalog, Grammar};
use std::sync::Arc;

/// A single-span rule.
pub fn match_rule(pattern: &str, scope: &str) -> RuleDef {
    RuleDef {
        match_pattern: Some(pattern.to_string()),
        scope: Some(scope.to_string()),
        ..RuleDef::default()
    }
}

/// A single-span rule with capture scopes.
pub fn captured_match_rule(pattern: &str, scope: &str, captures: &[(usize, &str)]) -> RuleDef {
    let mut rule = match_rule(pattern, scope);
    for (index, capture_scope) in captures {
        rule.captures
            .insert(index.to_string(), (*capture_scope).to_string());
    }
    rule
}

/// A region rule with child rules.
pub fn region_rule(begin: &str, end: &str, scope: &str, children: Vec<RuleDef>) -> RuleDef {
    RuleDef {
        begin: Some(begin.to_string()),
        end: Some(end.to_string()),
        scope: Some(scope.to_string()),
        patterns: children,
        ..RuleDef::default()
    }
}

/// A region rule whose interior is tokenized by another grammar.
pub fn delegate_region(begin: &str, end: &str, scope: &str, delegate: &str) -> RuleDef {
    RuleDef {
        begin: Some(begin.to_string()),
        end: Some(end.to_string()),
        scope: Some(scope.to_string()),
        delegate: Some(delegate.to_string()),
        ..RuleDef::default()
    }
}

/// An include rule: `#entry` for the repository, a bare name for a grammar.
pub fn include(reference: &str) -> RuleDef {
    RuleDef {
        include: Some(reference.to_string()),
        ..RuleDef::default()
    }
}

/// A grammar definition. An empty `scope` defaults to the grammar name.
pub fn grammar_def(name: &str, scope: &str, patterns: Vec<RuleDef>) -> GrammarDef {
    GrammarDef {
        name: name.to_string(),
        scope: if scope.is_empty() {
            None
        } else {
            Some(scope.to_string())
        },
        patterns,
        repository: Default::default(),
    }
}

/// Compile a definition, panicking on errors (test helper).
pub fn compile(def: GrammarDef) -> Arc<Grammar> {
    let (grammar, _warnings) =
        Grammar::compile(&def).expect("test grammar failed to compile");
    grammar
}

/// Compile a definition and publish it in the catalog (test helper).
pub fn register(def: GrammarDef) -> Arc<Grammar> {
    let grammar = compile(def);
    catalog::register(grammar.clone());
    grammar
}
