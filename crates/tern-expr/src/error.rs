//! Expression pipeline errors.

use thiserror::Error;

/// Error from any stage of the expression pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExprError {
    /// The scanner hit a character it cannot tokenize.
    #[error("lex error at offset {position}: {reason}")]
    Lex {
        /// Byte offset into the source text.
        position: usize,
        /// What went wrong.
        reason: String,
    },

    /// The parser saw an unexpected token.
    #[error("parse error at offset {position}: expected {expected}, got {got}")]
    Parse {
        /// What the grammar allowed here.
        expected: String,
        /// What was actually present.
        got: String,
        /// Byte offset of the offending token.
        position: usize,
    },

    /// Evaluation failed on a well-formed tree.
    #[error("eval error: {reason}")]
    Eval {
        /// What went wrong.
        reason: String,
    },
}

impl ExprError {
    /// Shorthand for an evaluation error.
    #[must_use]
    pub fn eval(reason: impl Into<String>) -> Self {
        Self::Eval {
            reason: reason.into(),
        }
    }
}
