//! Document Driver
//!
//!     The driver owns the line collection and, for every line boundary, the stack
//!     snapshot as it existed entering that line. That snapshot list is what buys
//!     incrementality: the line tokenizer is pure, so a line whose entry stack and text
//!     are unchanged is guaranteed to produce its previous result, and a re-scan can
//!     stop as soon as a re-tokenized line's ending stack equals the value previously
//!     recorded at that boundary (convergence).
//!
//! Edits
//!
//!     An edit replaces a run of lines. The entry snapshot of the first edited line is
//!     by construction unchanged by the edit, so the re-scan starts there and walks
//!     forward. Boundaries inside the spliced region have no pre-edit value and never
//!     count as convergence; boundaries beyond it keep their recorded values and end
//!     the scan as soon as one matches. An edit that opens an unterminated region
//!     converges nowhere and re-scans to the end of the document; that is a known,
//!     accepted cost, not an error.
//!
//! Cancellation
//!
//!     A rapid edit sequence may supersede an in-flight re-scan. The scan checks a
//!     caller-owned flag between lines, never mid-line, and commits a line's tokens
//!     and ending boundary together, so a cancelled scan leaves every committed line
//!     consistent and simply reports that it did not finish.

use crate::grammar::Grammar;
use crate::stack::ScopeStack;
use crate::token::Token;
use crate::tokenizer::{tokenize_line, TokenizeError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Error from a document operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// An edit range does not fit the document.
    EditOutOfBounds {
        start: usize,
        deleted: usize,
        lines: usize,
    },
    /// Tokenization failed (see [`TokenizeError`]).
    Tokenize(TokenizeError),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::EditOutOfBounds {
                start,
                deleted,
                lines,
            } => write!(
                f,
                "edit of {} line(s) at line {} is out of bounds for a {}-line document",
                deleted, start, lines
            ),
            DocumentError::Tokenize(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for DocumentError {}

impl From<TokenizeError> for DocumentError {
    fn from(err: TokenizeError) -> Self {
        DocumentError::Tokenize(err)
    }
}

/// Result of an incremental re-scan.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    /// Indices of lines whose token stream actually changed.
    pub changed: Vec<usize>,
    /// False when the scan was cancelled before convergence or end of
    /// document; lines committed so far are consistent.
    pub completed: bool,
}

/// A tokenized document: line texts, per-boundary stack snapshots, and the
/// last rendered token list per line.
pub struct Document {
    grammar: Arc<Grammar>,
    lines: Vec<String>,
    /// `stacks[i]` enters line `i`; `stacks[line_count]` is the stack after
    /// the last line. Always `lines.len() + 1` entries.
    stacks: Vec<ScopeStack>,
    tokens: Vec<Vec<Token>>,
}

impl Document {
    /// Tokenize `text` in full. The text is split on `\n` (a trailing `\r`
    /// per line is dropped); an empty text is a single empty line.
    pub fn new(grammar: &Arc<Grammar>, text: &str) -> Result<Self, DocumentError> {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self::from_lines(grammar, lines)
    }

    /// Tokenize an explicit line collection in full.
    pub fn from_lines(grammar: &Arc<Grammar>, lines: Vec<String>) -> Result<Self, DocumentError> {
        let base = ScopeStack::base(grammar).map_err(TokenizeError::Unresolved)?;
        let mut stacks = Vec::with_capacity(lines.len() + 1);
        let mut tokens = Vec::with_capacity(lines.len());
        let mut current = base;
        stacks.push(current.clone());
        for line in &lines {
            let run = tokenize_line(line, &current)?;
            tokens.push(run.tokens);
            current = run.stack;
            stacks.push(current.clone());
        }
        Ok(Document {
            grammar: grammar.clone(),
            lines,
            stacks,
            tokens,
        })
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// The last rendered token list for a line.
    pub fn tokens(&self, index: usize) -> Option<&[Token]> {
        self.tokens.get(index).map(Vec::as_slice)
    }

    /// The stack snapshot entering a line.
    pub fn entry_stack(&self, index: usize) -> Option<&ScopeStack> {
        if index < self.lines.len() {
            self.stacks.get(index)
        } else {
            None
        }
    }

    /// The stack after the last line. For a document whose regions are all
    /// well formed this equals the base stack.
    pub fn end_stack(&self) -> &ScopeStack {
        &self.stacks[self.lines.len()]
    }

    /// Reassemble the document text.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Replace `deleted` lines at `start` with `inserted`, then re-tokenize
    /// forward from `start` until convergence or end of document. Returns
    /// exactly the lines whose token stream changed.
    pub fn apply_edit(
        &mut self,
        start: usize,
        deleted: usize,
        inserted: Vec<String>,
    ) -> Result<EditOutcome, DocumentError> {
        self.apply_edit_inner(start, deleted, inserted, None)
    }

    /// Like [`apply_edit`](Self::apply_edit), checking `cancel` between
    /// lines. A newer edit should set the flag and re-issue itself.
    pub fn apply_edit_with_cancel(
        &mut self,
        start: usize,
        deleted: usize,
        inserted: Vec<String>,
        cancel: &AtomicBool,
    ) -> Result<EditOutcome, DocumentError> {
        self.apply_edit_inner(start, deleted, inserted, Some(cancel))
    }

    fn apply_edit_inner(
        &mut self,
        start: usize,
        deleted: usize,
        inserted: Vec<String>,
        cancel: Option<&AtomicBool>,
    ) -> Result<EditOutcome, DocumentError> {
        if start > self.lines.len() || deleted > self.lines.len() - start {
            return Err(DocumentError::EditOutOfBounds {
                start,
                deleted,
                lines: self.lines.len(),
            });
        }

        let inserted_len = inserted.len();
        self.lines.splice(start..start + deleted, inserted);
        self.tokens.splice(
            start..start + deleted,
            std::iter::repeat_with(Vec::new).take(inserted_len),
        );
        // The boundary entering `start` is untouched, and the boundary
        // entering the first kept line keeps its recorded value so the scan
        // can converge on it. Boundaries strictly inside the replaced region
        // have no pre-edit meaning; they are seeded with the entry stack and
        // overwritten as the scan walks forward.
        let seed = self.stacks[start].clone();
        let (remove_end, seed_count) = match (deleted, inserted_len) {
            (0, added) => (start + 1, added),
            (removed, 0) => (start + 1 + removed, 0),
            (removed, added) => (start + removed, added - 1),
        };
        self.stacks.splice(
            start + 1..remove_end,
            std::iter::repeat_with(|| seed.clone()).take(seed_count),
        );

        // Boundaries before this index precede a line with no pre-edit
        // counterpart; a stack match there says nothing about downstream
        // lines.
        let min_boundary = start + inserted_len;
        let mut changed = Vec::new();
        let mut line = start;
        while line < self.lines.len() {
            if let Some(cancel) = cancel {
                if cancel.load(Ordering::Relaxed) {
                    trace!(line, "re-scan cancelled between lines");
                    return Ok(EditOutcome {
                        changed,
                        completed: false,
                    });
                }
            }
            let run = tokenize_line(&self.lines[line], &self.stacks[line])?;
            let boundary = line + 1;
            let converged = boundary >= min_boundary && run.stack == self.stacks[boundary];
            if run.tokens != self.tokens[line] {
                self.tokens[line] = run.tokens;
                changed.push(line);
            }
            self.stacks[boundary] = run.stack;
            if converged {
                trace!(line, "re-scan converged");
                break;
            }
            line += 1;
        }
        Ok(EditOutcome {
            changed,
            completed: true,
        })
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("grammar", &self.grammar.name())
            .field("lines", &self.lines.len())
            .finish()
    }
}
