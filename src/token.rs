//! Token types produced by the line tokenizer.

use crate::stack::ScopeStack;
use std::fmt;
use std::ops::Range;

/// A classified span of one line.
///
/// Spans are half-open byte ranges. Within one line's token list, tokens are
/// contiguous, non-overlapping, and together cover the whole line.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Byte range within the line.
    pub span: Range<usize>,
    /// Scope tags in effect over the span, bottom-to-top.
    pub scopes: Vec<String>,
}

impl Token {
    pub fn new(span: Range<usize>, scopes: Vec<String>) -> Self {
        Token { span, scopes }
    }

    /// The token's text, sliced out of the line it was produced from.
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.span.clone()]
    }

    /// The innermost (topmost) scope tag.
    pub fn innermost_scope(&self) -> Option<&str> {
        self.scopes.last().map(String::as_str)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{} [{}]",
            self.span.start,
            self.span.end,
            self.scopes.join(" ")
        )
    }
}

/// The result of tokenizing one line: the token list covering it and the
/// stack to carry into the next line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRun {
    pub tokens: Vec<Token>,
    pub stack: ScopeStack,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_text_slices_line() {
        let token = Token::new(3..5, vec!["number".to_string()]);
        assert_eq!(token.text("ab 12 cd"), "12");
    }

    #[test]
    fn test_innermost_scope() {
        let token = Token::new(
            0..1,
            vec!["source".to_string(), "block".to_string(), "number".to_string()],
        );
        assert_eq!(token.innermost_scope(), Some("number"));
    }

    #[test]
    fn test_display_format() {
        let token = Token::new(0..2, vec!["source".to_string(), "keyword".to_string()]);
        assert_eq!(token.to_string(), "0..2 [source keyword]");
    }
}
