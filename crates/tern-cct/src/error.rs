//! CCT errors.

use std::path::PathBuf;
use tern_core::ValueError;
use tern_expr::ExprError;
use thiserror::Error;

/// Errors from ingesting or querying a conditional configuration tree.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CctError {
    /// A key's guard segment failed to lex or parse.
    #[error("{file}: key `{key}`: malformed guard: {source}")]
    MalformedGuard {
        /// File the key came from.
        file: PathBuf,
        /// The full offending key.
        key: String,
        /// The underlying expression error, which carries the token
        /// position for lex failures.
        source: ExprError,
    },

    /// A key mixed base segments in after a guard segment.
    #[error("{file}: key `{key}`: base segment `{segment}` after a guard")]
    BaseAfterGuard {
        /// File the key came from.
        file: PathBuf,
        /// The full offending key.
        key: String,
        /// The out-of-place segment.
        segment: String,
    },

    /// The document root was not a mapping.
    #[error("{file}: document root must be a mapping")]
    NotAMapping {
        /// The offending file.
        file: PathBuf,
    },

    /// A YAML document failed to parse.
    #[error("{file}: {reason}")]
    Yaml {
        /// The offending file.
        file: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A value under a key had the wrong shape for the requested reducer.
    #[error("{file}: key `{key}`: {source}")]
    BadValue {
        /// File the value came from.
        file: PathBuf,
        /// The key whose value was rejected.
        key: String,
        /// The underlying conversion error.
        source: ValueError,
    },

    /// A guard failed to evaluate (e.g. division by zero).
    #[error("key `{key}`: guard `{guard}` failed: {source}")]
    GuardEval {
        /// The key whose guard failed.
        key: String,
        /// The guard text.
        guard: String,
        /// The underlying evaluation error.
        source: ExprError,
    },
}
