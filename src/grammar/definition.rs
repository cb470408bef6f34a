//! Rule-set document model
//!
//!     This is the serializable form a grammar arrives in. The engine's contract is on
//!     the compiled [`Grammar`](crate::grammar::Grammar), not on any byte format; hosts
//!     hand these records over however they like (the [`loader`](crate::loader) module
//!     provides JSON and YAML front-ends).
//!
//!     Capture maps are keyed by the capture group number written as a string, which is
//!     what both JSON and YAML objects give us. `include` values starting with `#` name a
//!     repository entry of the same grammar; any other value names an external grammar's
//!     top level.

use std::collections::BTreeMap;

/// A grammar as written in a rule-set document.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GrammarDef {
    /// Unique key in the grammar catalog.
    pub name: String,

    /// Base scope tag carried by the bottom frame. Defaults to the grammar name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Top-level rule list, highest priority first.
    #[serde(default)]
    pub patterns: Vec<RuleDef>,

    /// Named, reusable rule fragments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub repository: BTreeMap<String, Vec<RuleDef>>,
}

/// One rule as written in a rule-set document.
///
/// Exactly one of `match`, `begin`+`end`, or `include` must be present.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuleDef {
    /// Pattern for a single-span rule.
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_pattern: Option<String>,

    /// Begin pattern for a region rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<String>,

    /// End pattern for a region rule. May back-reference begin captures (`\1`..`\9`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Scope tag for the match span or the begun region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Capture scopes for a match rule, keyed by capture number.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub captures: BTreeMap<String, String>,

    /// Capture scopes for the begin match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub begin_captures: BTreeMap<String, String>,

    /// Capture scopes for the end match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub end_captures: BTreeMap<String, String>,

    /// Child rules searched inside the region.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<RuleDef>,

    /// Grammar whose top-level rules replace `patterns` inside the region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,

    /// Reference to a repository entry (`#name`) or an external grammar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    /// Compile this rule's patterns case-insensitively.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub case_insensitive: bool,
}
