//! Grammar rule model
//!
//!     A rule is one node of a grammar: match a span, open a region, or include another
//!     rule list by name. Rules are stored in a per-grammar arena and addressed by
//!     [`RuleId`], so rule lists (the grammar top level, repository entries, region child
//!     lists) are plain id vectors and sharing a list never copies rules. This is what
//!     makes recursive inclusion workable: an include is an indirection that is expanded
//!     into live handles when a frame is entered, not a subtree that gets cloned.

use crate::pattern::{EndTemplate, Pattern, PatternError};
use std::sync::Arc;

/// Identifies a rule within its grammar's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) usize);

/// A scope assignment for capture groups of a pattern.
///
/// Entries are kept sorted by capture index; index 0 is the whole match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureScopes {
    entries: Vec<(usize, String)>,
}

impl CaptureScopes {
    pub fn new(mut entries: Vec<(usize, String)>) -> Self {
        entries.sort_by_key(|(index, _)| *index);
        CaptureScopes { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(i, s)| (*i, s.as_str()))
    }
}

/// A rule node. The scope stack machine switches on this tag explicitly;
/// there is no dispatch spread across rule kinds.
#[derive(Debug)]
pub enum Rule {
    /// Match a pattern and scope the span (and its captures).
    Match(MatchRule),
    /// Open a region delimited by a begin and an end pattern.
    Region(RegionRule),
    /// Stand in for another rule list, resolved by name at frame entry.
    Include(IncludeRef),
}

#[derive(Debug)]
pub struct MatchRule {
    pub pattern: Pattern,
    /// Scope tag for the whole match, if any.
    pub scope: Option<String>,
    pub captures: CaptureScopes,
}

#[derive(Debug)]
pub struct RegionRule {
    pub begin: Pattern,
    pub end: EndPattern,
    /// Scope tag contributed by the region's frame, if any.
    pub scope: Option<String>,
    pub begin_captures: CaptureScopes,
    pub end_captures: CaptureScopes,
    /// Rules searched inside the region, highest priority first.
    /// Ignored when `delegate` is set.
    pub children: Vec<RuleId>,
    /// Name of a grammar whose top-level rules take over the region interior.
    pub delegate: Option<String>,
}

/// An end pattern, compiled eagerly when it has no back-references.
#[derive(Debug)]
pub enum EndPattern {
    /// Compiled once at grammar compile time.
    Static(Arc<Pattern>),
    /// Echoes begin captures; compiled at region entry.
    Template(EndTemplate),
}

impl EndPattern {
    /// Resolve against the begin match's capture texts.
    pub fn resolve(&self, captures: &[Option<String>]) -> Result<Arc<Pattern>, PatternError> {
        match self {
            EndPattern::Static(pattern) => Ok(pattern.clone()),
            EndPattern::Template(template) => template.resolve(captures).map(Arc::new),
        }
    }

    /// The pattern source as written in the rule set.
    pub fn source(&self) -> &str {
        match self {
            EndPattern::Static(pattern) => pattern.source(),
            EndPattern::Template(template) => template.source(),
        }
    }
}

/// Target of an `Include` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeRef {
    /// `#name`: an entry in the current grammar's repository.
    Repository(String),
    /// The top-level rule list of a named grammar in the catalog.
    Grammar(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_scopes_sorted_by_index() {
        let captures = CaptureScopes::new(vec![
            (2, "second".to_string()),
            (1, "first".to_string()),
        ]);
        let order: Vec<usize> = captures.iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_static_end_ignores_captures() {
        let pattern = Pattern::new(r"\}", false).unwrap();
        let end = EndPattern::Static(Arc::new(pattern));
        let resolved = end.resolve(&[Some("ignored".to_string())]).unwrap();
        assert_eq!(resolved.source(), r"\}");
    }

    #[test]
    fn test_template_end_resolves_captures() {
        let template = EndTemplate::parse(r"</\1>", false).unwrap();
        let end = EndPattern::Template(template);
        let resolved = end.resolve(&[Some("div".to_string())]).unwrap();
        assert!(resolved.find_at("</div>", 0).is_some());
    }
}
