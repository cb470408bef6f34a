//! Frames and the Scope Stack
//!
//!     A frame is one currently-open region: the grammar whose rules are in effect
//!     inside it, the flattened rule search list, the resolved end pattern (fixed for
//!     the frame's lifetime, back-references already substituted), and the scope tags
//!     the frame contributes. The stack always has its bottom frame: the grammar's
//!     base scope with the top-level rule list and no end pattern.
//!
//!     The stack is the state threaded from line to line: the document driver stores
//!     the stack entering every line and compares stacks to decide where an
//!     incremental re-scan may stop. Equality therefore has to capture everything the
//!     tokenizer's output depends on: the grammar instance, the originating rule, the
//!     resolved end pattern source, the scope tags, and the rule list in effect (the
//!     list can differ from the originating rule alone, e.g. when a missing delegate
//!     degraded a region to a plain span).

use crate::grammar::{flatten_rules, Grammar, RuleHandle, UnresolvedReference};
use crate::pattern::Pattern;
use std::fmt;
use std::sync::Arc;

/// One entry of the scope stack: a currently-open region, or the base frame.
#[derive(Clone)]
pub struct Frame {
    /// Grammar whose rules are searched inside this frame (the delegate
    /// grammar when the region delegates).
    grammar: Arc<Grammar>,
    /// The region rule that opened this frame; `None` for the base frame.
    origin: Option<RuleHandle>,
    /// Flattened rule search list in effect.
    rules: Arc<[RuleHandle]>,
    /// Resolved end pattern; `None` for the base frame.
    end: Option<Arc<Pattern>>,
    /// Scope tags contributed by this frame, bottom-to-top.
    scopes: Vec<String>,
}

impl Frame {
    pub(crate) fn new(
        grammar: Arc<Grammar>,
        origin: Option<RuleHandle>,
        rules: Arc<[RuleHandle]>,
        end: Option<Arc<Pattern>>,
        scopes: Vec<String>,
    ) -> Self {
        Frame {
            grammar,
            origin,
            rules,
            end,
            scopes,
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub(crate) fn origin(&self) -> Option<&RuleHandle> {
        self.origin.as_ref()
    }

    pub(crate) fn rules(&self) -> &[RuleHandle] {
        &self.rules
    }

    pub(crate) fn end(&self) -> Option<&Arc<Pattern>> {
        self.end.as_ref()
    }

    /// Scope tags contributed by this frame.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        let same_origin = match (&self.origin, &other.origin) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_rule(b),
            _ => false,
        };
        same_origin
            && Arc::ptr_eq(&self.grammar, &other.grammar)
            && self.scopes == other.scopes
            && self.end.as_ref().map(|p| p.source())
                == other.end.as_ref().map(|p| p.source())
            && same_rule_list(&self.rules, &other.rules)
    }
}

fn same_rule_list(a: &Arc<[RuleHandle]>, b: &Arc<[RuleHandle]>) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same_rule(y))
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("grammar", &self.grammar.name())
            .field("scopes", &self.scopes)
            .field("end", &self.end.as_ref().map(|p| p.source()))
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// The ordered stack of open regions. Never empty.
#[derive(Clone, PartialEq)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    /// The stack a document starts with: a single base frame carrying the
    /// grammar's base scope and its top-level rule list.
    ///
    /// Fails if the top level includes an external grammar that is not in
    /// the catalog.
    pub fn base(grammar: &Arc<Grammar>) -> Result<Self, UnresolvedReference> {
        let rules = flatten_rules(grammar, grammar.top())?;
        let base = Frame::new(
            grammar.clone(),
            None,
            rules,
            None,
            vec![grammar.base_scope().to_string()],
        );
        Ok(ScopeStack {
            frames: vec![base],
        })
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn top(&self) -> &Frame {
        // The base frame is never popped, so the stack is never empty.
        &self.frames[self.frames.len() - 1]
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pop the top frame. The machine only pops frames with an end pattern,
    /// so the base frame stays put.
    pub(crate) fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// All scope tags in effect, concatenated bottom-to-top.
    pub fn scope_tags(&self) -> Vec<String> {
        self.frames
            .iter()
            .flat_map(|f| f.scopes.iter().cloned())
            .collect()
    }
}

impl fmt::Debug for ScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.frames.iter()).finish()
    }
}
