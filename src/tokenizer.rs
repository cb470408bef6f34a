//! Line Tokenizer
//!
//!     The single call an editor integration needs: one line of text in, a token list
//!     covering it and the stack for the next line out. The function is pure: the same
//!     line, starting stack, and grammar catalog always produce the same output. That
//!     is what makes the document driver's incremental re-scan sound, since a line
//!     whose starting condition is unchanged cannot produce a different result.

use crate::grammar::UnresolvedReference;
use crate::machine::LineMachine;
use crate::pattern::PatternError;
use crate::stack::ScopeStack;
use crate::token::LineRun;
use std::fmt;

/// Fatal tokenization error.
///
/// No-rule-matched is not an error (the line remainder is emitted under the
/// current stack), and neither is an unterminated region. What is fatal is a
/// cross-grammar reference that is still unresolved when a frame needs it,
/// or an end pattern that no longer compiles after back-reference
/// substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenizeError {
    /// An `include` names a grammar absent from the catalog.
    Unresolved(UnresolvedReference),
    /// A resolved end pattern failed to compile.
    EndPattern(PatternError),
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizeError::Unresolved(err) => write!(f, "{}", err),
            TokenizeError::EndPattern(err) => {
                write!(f, "end pattern failed to resolve: {}", err)
            }
        }
    }
}

impl std::error::Error for TokenizeError {}

impl From<UnresolvedReference> for TokenizeError {
    fn from(err: UnresolvedReference) -> Self {
        TokenizeError::Unresolved(err)
    }
}

/// Tokenize one line from a starting stack.
///
/// The starting stack is taken by reference and never mutated; the returned
/// [`LineRun`] carries the ending stack to thread into the next line.
pub fn tokenize_line(line: &str, stack: &ScopeStack) -> Result<LineRun, TokenizeError> {
    LineMachine::new(line, stack.clone()).run()
}
