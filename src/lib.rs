//! # scopeline
//!
//! A nested-grammar tokenization engine for scope classification.
//!
//! scopeline assigns every character of a document a stack of scope tags
//! (`keyword.control`, `string.quoted`, ...) by walking it line by line with a
//! declarative rule set, and re-walks only the invalidated region when the
//! document is edited. Rule sets can open regions whose interior is tokenized
//! by a different rule set (a block of one language embedded in another,
//! recursively), which is the shape hybrid sources actually have.
//!
//! The engine knows nothing about editors, themes, or file types. It consumes
//! a rule-set document (see [`grammar::definition`]) and line text, and
//! produces tokens plus a persistable end-of-line state:
//!
//! - [`tokenizer::tokenize_line`] is the per-line entry point: line text and
//!   a starting stack in, a covering token list and the ending stack out.
//! - [`document::Document`] drives a whole document and implements the
//!   incremental re-scan with convergence detection.
//! - [`grammar::catalog`] is the process-wide registry that cross-grammar
//!   references and delegate regions resolve against.
//!
//! For testing guidelines and the shared grammar factories, see the
//! [testing module](testing).

pub mod document;
pub mod grammar;
pub mod loader;
pub mod pattern;
pub mod rule;
pub mod stack;
pub mod testing;
pub mod token;
pub mod tokenizer;

mod machine;

pub use document::{Document, DocumentError, EditOutcome};
pub use grammar::definition::{GrammarDef, RuleDef};
pub use grammar::{catalog, CompileError, CompileWarning, Grammar};
pub use loader::{GrammarLoader, LoadError};
pub use stack::{Frame, ScopeStack};
pub use token::{LineRun, Token};
pub use tokenizer::{tokenize_line, TokenizeError};
