//! Scope Stack Machine
//!
//!     The stateful core of the engine. The machine advances a cursor through one line,
//!     holding the stack of open regions, and at every position runs the same contest:
//!
//!         1. Candidates are the top frame's end pattern (when one exists) plus every
//!            rule in the top frame's search list, includes already flattened.
//!         2. All candidates are evaluated from the cursor forward; the one whose match
//!            starts earliest wins. On a positional tie the end pattern wins (regions
//!            close before same-position child rules fire), otherwise the
//!            earliest-declared rule wins.
//!         3. No candidate matches: the rest of the line is one token under the current
//!            stack, which carries unchanged into the next line.
//!         4. The end pattern won: pop the frame after emitting the end span.
//!         5. A match rule won: emit the span, segmented by its capture scopes.
//!         6. A region rule won: resolve the end pattern against the begin captures and
//!            push a frame. With a delegate reference, the frame searches the delegate
//!            grammar's top-level rules; the end pattern stays the outer rule's own, so
//!            control returns to the outer language when it matches, and the delegate
//!            grammar never needs to know who embedded it.
//!
//! Zero-Width Matches
//!
//!     A rule may legally match the empty string. Such a match classifies nothing (there
//!     is no span to scope), so the machine forces the cursor one character forward and
//!     lets the skipped character join the following plain-text token, so coverage of
//!     the line is preserved and the walk always terminates. Two line-local guards extend
//!     this to regions: a zero-width begin never re-opens a frame it already opened at
//!     the same position, and a zero-width end that closes a frame at the position its
//!     zero-width begin opened it forces the cursor forward after the pop. The guards
//!     live in the machine, not in the stack, so persisted line states stay a pure
//!     function of the input.

use crate::grammar::{catalog, flatten_rules, RuleHandle};
use crate::pattern::PatternMatch;
use crate::rule::{CaptureScopes, MatchRule, Rule};
use crate::stack::{Frame, ScopeStack};
use crate::token::{LineRun, Token};
use crate::tokenizer::TokenizeError;
use std::ops::Range;
use std::sync::Arc;
use tracing::warn;

/// The winning candidate at one cursor position.
enum Winner {
    /// The top frame's end pattern.
    End(PatternMatch),
    /// A rule from the top frame's search list.
    Rule(RuleHandle, PatternMatch),
}

pub(crate) struct LineMachine<'a> {
    line: &'a str,
    stack: ScopeStack,
    tokens: Vec<Token>,
    /// Search position.
    cursor: usize,
    /// Start of plain text not yet emitted as a token.
    plain_start: usize,
    /// One entry per frame: where a zero-width begin opened it on this line.
    /// `None` for frames inherited from previous lines or opened by a
    /// consuming begin match.
    zero_width_pushes: Vec<Option<(RuleHandle, usize)>>,
}

impl<'a> LineMachine<'a> {
    pub(crate) fn new(line: &'a str, stack: ScopeStack) -> Self {
        let depth = stack.depth();
        LineMachine {
            line,
            stack,
            tokens: Vec::new(),
            cursor: 0,
            plain_start: 0,
            zero_width_pushes: vec![None; depth],
        }
    }

    pub(crate) fn run(mut self) -> Result<LineRun, TokenizeError> {
        let len = self.line.len();
        while self.cursor <= len {
            match self.find_winner() {
                None => break,
                Some(Winner::End(m)) => self.close_region(&m),
                Some(Winner::Rule(handle, m)) => match handle.rule() {
                    Rule::Match(rule) => self.apply_match(rule, &m),
                    Rule::Region(_) => self.open_region(&handle, &m)?,
                    // Flattening removed includes from every search list.
                    Rule::Include(_) => break,
                },
            }
        }
        if self.plain_start < len {
            let scopes = self.stack.scope_tags();
            self.tokens.push(Token::new(self.plain_start..len, scopes));
        }
        Ok(LineRun {
            tokens: self.tokens,
            stack: self.stack,
        })
    }

    /// Evaluate all candidates from the cursor and pick the earliest match.
    /// The end pattern is tried first and later candidates replace it only
    /// with a strictly earlier start, which gives both tie-break rules at
    /// once: end over rules, earlier-declared over later.
    fn find_winner(&self) -> Option<Winner> {
        let top = self.stack.top();
        let mut best: Option<(usize, Winner)> = None;
        if let Some(end) = top.end() {
            if let Some(m) = end.find_at(self.line, self.cursor) {
                best = Some((m.start, Winner::End(m)));
            }
        }
        for handle in top.rules() {
            let pattern = match handle.rule() {
                Rule::Match(rule) => &rule.pattern,
                Rule::Region(rule) => &rule.begin,
                Rule::Include(_) => continue,
            };
            if let Some(m) = pattern.find_at(self.line, self.cursor) {
                if best.as_ref().map_or(true, |(start, _)| m.start < *start) {
                    best = Some((m.start, Winner::Rule(handle.clone(), m)));
                }
            }
        }
        best.map(|(_, winner)| winner)
    }

    fn apply_match(&mut self, rule: &MatchRule, m: &PatternMatch) {
        self.emit_plain(m.start);
        if m.is_empty() {
            self.cursor = self.advance_one(m.start);
            return;
        }
        let mut base = self.stack.scope_tags();
        if let Some(scope) = &rule.scope {
            base.push(scope.clone());
        }
        self.emit_segmented(m, base, &rule.captures);
        self.cursor = m.end;
        self.plain_start = m.end;
    }

    fn open_region(&mut self, handle: &RuleHandle, m: &PatternMatch) -> Result<(), TokenizeError> {
        let Rule::Region(region) = handle.rule() else {
            return Ok(());
        };
        self.emit_plain(m.start);

        if m.is_empty() && self.already_open_at(handle, m.start) {
            self.cursor = self.advance_one(m.start);
            return Ok(());
        }

        let begin_texts = m.capture_texts(self.line);
        let end = region
            .end
            .resolve(&begin_texts)
            .map_err(TokenizeError::EndPattern)?;

        let frame_scopes: Vec<String> = region.scope.iter().cloned().collect();
        if !m.is_empty() {
            let mut base = self.stack.scope_tags();
            base.extend(frame_scopes.iter().cloned());
            self.emit_segmented(m, base, &region.begin_captures);
        }

        let (grammar, rules) = match &region.delegate {
            Some(name) => match catalog::lookup(name) {
                Some(delegate) => {
                    let rules = flatten_rules(&delegate, delegate.top())
                        .map_err(TokenizeError::Unresolved)?;
                    (delegate, rules)
                }
                None => {
                    warn!(
                        delegate = %name,
                        grammar = %handle.grammar.name(),
                        "delegate grammar not registered; region degrades to a plain span"
                    );
                    (handle.grammar.clone(), Arc::from(Vec::<RuleHandle>::new()))
                }
            },
            None => {
                let rules = flatten_rules(&handle.grammar, &region.children)
                    .map_err(TokenizeError::Unresolved)?;
                (handle.grammar.clone(), rules)
            }
        };

        self.stack.push(Frame::new(
            grammar,
            Some(handle.clone()),
            rules,
            Some(end),
            frame_scopes,
        ));
        self.zero_width_pushes.push(if m.is_empty() {
            Some((handle.clone(), m.start))
        } else {
            None
        });
        self.cursor = m.end;
        self.plain_start = m.end;
        Ok(())
    }

    fn close_region(&mut self, m: &PatternMatch) {
        self.emit_plain(m.start);
        let end_captures = match self.stack.top().origin().map(RuleHandle::rule) {
            Some(Rule::Region(region)) => region.end_captures.clone(),
            _ => CaptureScopes::default(),
        };
        if !m.is_empty() {
            // The frame is still on the stack, so the base scopes include
            // the region's own tag.
            let base = self.stack.scope_tags();
            self.emit_segmented(m, base, &end_captures);
        }
        if self.stack.pop().is_some() {
            let guard = self.zero_width_pushes.pop().flatten();
            self.cursor = m.end;
            self.plain_start = m.end;
            if m.is_empty() {
                if let Some((_, push_pos)) = guard {
                    if push_pos == m.start {
                        self.cursor = self.advance_one(m.end);
                    }
                }
            }
        }
    }

    /// Whether a frame opened by `handle` at `pos` through a zero-width
    /// begin is still on the stack.
    fn already_open_at(&self, handle: &RuleHandle, pos: usize) -> bool {
        self.zero_width_pushes
            .iter()
            .flatten()
            .any(|(open, open_pos)| *open_pos == pos && open.same_rule(handle))
    }

    /// Emit pending plain text up to `upto` under the current stack.
    fn emit_plain(&mut self, upto: usize) {
        if self.plain_start < upto {
            let scopes = self.stack.scope_tags();
            self.tokens.push(Token::new(self.plain_start..upto, scopes));
            self.plain_start = upto;
        }
    }

    /// Emit a match span, split at capture boundaries. Each segment gets the
    /// base scopes plus the scope of every capture containing it, in capture
    /// index order.
    fn emit_segmented(&mut self, m: &PatternMatch, base: Vec<String>, captures: &CaptureScopes) {
        let spans: Vec<(Range<usize>, &str)> = captures
            .iter()
            .filter_map(|(index, scope)| {
                m.capture(index)
                    .filter(|r| r.start < r.end)
                    .map(|r| (r, scope))
            })
            .collect();
        if spans.is_empty() {
            self.tokens.push(Token::new(m.span(), base));
            return;
        }
        let mut bounds = vec![m.start, m.end];
        for (range, _) in &spans {
            bounds.push(range.start);
            bounds.push(range.end);
        }
        bounds.sort_unstable();
        bounds.dedup();
        for pair in bounds.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let mut scopes = base.clone();
            for (range, scope) in &spans {
                if range.start <= start && end <= range.end {
                    scopes.push((*scope).to_string());
                }
            }
            self.tokens.push(Token::new(start..end, scopes));
        }
    }

    /// One character forward from `pos`, or past end of line when at it.
    fn advance_one(&self, pos: usize) -> usize {
        match self.line[pos..].chars().next() {
            Some(c) => pos + c.len_utf8(),
            None => pos + 1,
        }
    }
}
