//! Line Pattern Matching
//!
//!     This module wraps a single regular expression pattern for use by the scope stack
//!     machine. All matching is per-line: a pattern is evaluated against one line of text
//!     from a start offset, and reports the earliest match at or after that offset together
//!     with every capture group span. The machine evaluates many candidate patterns at the
//!     same offset and picks the one whose match starts earliest, so the only query a
//!     pattern needs to answer is "where is your first match from here".
//!
//! End Pattern Templates
//!
//!     End patterns of region rules may echo text captured by the region's begin pattern
//!     (for example begin `<(\w+)>` with end `</\1>`). The regex engine used here has no
//!     back-reference support, so such patterns are kept as templates: a sequence of literal
//!     regex fragments and back-reference slots. When a region is entered, the slots are
//!     substituted with the escaped text the begin match captured and the result is compiled
//!     into an ordinary pattern, fixed for the lifetime of that frame.
//!
//!     Template syntax errors are surfaced when the grammar is loaded by probe-compiling
//!     the template with empty substitutions; substitution itself inserts only escaped
//!     literals, so a template that probed clean stays clean in practice.

use regex::RegexBuilder;
use std::fmt;
use std::ops::Range;

/// Error raised when a pattern string does not compile.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternError {
    /// The offending pattern source.
    pub pattern: String,
    /// The regex engine's explanation.
    pub message: String,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pattern `{}`: {}", self.pattern, self.message)
    }
}

impl std::error::Error for PatternError {}

/// A compiled single-line pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: regex::Regex,
}

impl Pattern {
    /// Compile a pattern. Malformed patterns are reported here, never at match time.
    pub fn new(source: &str, case_insensitive: bool) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| PatternError {
                pattern: source.to_string(),
                message: e.to_string(),
            })?;
        Ok(Pattern {
            source: source.to_string(),
            case_insensitive,
            regex,
        })
    }

    /// The pattern source string.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of capture groups, including group 0 (the whole match).
    pub fn capture_count(&self) -> usize {
        self.regex.captures_len()
    }

    /// Earliest match starting at or after `offset`, with all capture spans.
    ///
    /// `offset` must lie on a character boundary of `line`.
    pub fn find_at(&self, line: &str, offset: usize) -> Option<PatternMatch> {
        if offset > line.len() {
            return None;
        }
        let caps = self.regex.captures_at(line, offset)?;
        let full = caps.get(0)?;
        let captures = (1..caps.len())
            .map(|i| caps.get(i).map(|m| m.start()..m.end()))
            .collect();
        Some(PatternMatch {
            start: full.start(),
            end: full.end(),
            captures,
        })
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

/// The span of one pattern match within a line, plus its capture spans.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    /// Byte offset where the match starts.
    pub start: usize,
    /// Byte offset one past the end of the match.
    pub end: usize,
    /// Capture group spans for groups 1.., in group order. `None` for groups
    /// that did not participate in the match.
    pub captures: Vec<Option<Range<usize>>>,
}

impl PatternMatch {
    /// The whole match as a half-open byte range.
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether the match consumed no input.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Span of capture group `index`, where group 0 is the whole match.
    pub fn capture(&self, index: usize) -> Option<Range<usize>> {
        if index == 0 {
            Some(self.span())
        } else {
            self.captures.get(index - 1).cloned().flatten()
        }
    }

    /// Texts of groups 1.., resolved against the line the match came from.
    pub fn capture_texts(&self, line: &str) -> Vec<Option<String>> {
        self.captures
            .iter()
            .map(|c| c.clone().map(|r| line[r].to_string()))
            .collect()
    }
}

/// One piece of an end pattern template.
#[derive(Debug, Clone, PartialEq)]
enum TemplatePart {
    /// A literal regex fragment, kept verbatim.
    Literal(String),
    /// A back-reference to a begin capture group (1-9).
    BackRef(usize),
}

/// An end pattern that echoes text captured by its region's begin pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct EndTemplate {
    source: String,
    case_insensitive: bool,
    parts: Vec<TemplatePart>,
}

impl EndTemplate {
    /// Parse `source` into literal fragments and back-reference slots.
    ///
    /// `\1` through `\9` are back-references; any other escape (including `\\`)
    /// passes through as regex text. The template is probe-compiled with empty
    /// substitutions so syntax errors surface at grammar load.
    pub fn parse(source: &str, case_insensitive: bool) -> Result<Self, PatternError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.peek().copied() {
                    Some(d @ '1'..='9') => {
                        let index = d as usize - '0' as usize;
                        chars.next();
                        if !literal.is_empty() {
                            parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                        }
                        parts.push(TemplatePart::BackRef(index));
                    }
                    Some(next) => {
                        literal.push('\\');
                        literal.push(next);
                        chars.next();
                    }
                    None => literal.push('\\'),
                }
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        let template = EndTemplate {
            source: source.to_string(),
            case_insensitive,
            parts,
        };
        // Probe with no captured text so malformed templates fail at load.
        template.resolve(&[])?;
        Ok(template)
    }

    /// The template source string, back-references included.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether any back-reference slot is present.
    pub fn has_backrefs(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, TemplatePart::BackRef(_)))
    }

    /// Substitute begin-capture texts and compile the concrete end pattern.
    ///
    /// `captures[i]` is the text of begin group `i + 1`; missing or absent
    /// groups substitute as the empty string. Substituted text is escaped, so
    /// captured input can never alter the pattern's structure.
    pub fn resolve(&self, captures: &[Option<String>]) -> Result<Pattern, PatternError> {
        let mut resolved = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => resolved.push_str(text),
                TemplatePart::BackRef(index) => {
                    if let Some(Some(text)) = captures.get(index - 1) {
                        resolved.push_str(&regex::escape(text));
                    }
                }
            }
        }
        Pattern::new(&resolved, self.case_insensitive)
    }
}
