//! Package-model errors.

use std::path::PathBuf;
use tern_cct::CctError;
use tern_core::PkgRefError;
use thiserror::Error;

/// Errors from loading or querying packages.
#[derive(Debug, Error)]
pub enum PkgError {
    /// The descriptor named an unknown package type.
    #[error("{file}: unknown package type `{found}`")]
    UnknownType {
        /// The descriptor file.
        file: PathBuf,
        /// The rejected type string.
        found: String,
    },

    /// The descriptor is missing a required key.
    #[error("{file}: missing required key `{key}`")]
    MissingKey {
        /// The descriptor file.
        file: PathBuf,
        /// The missing key.
        key: String,
    },

    /// A stage entry had a shape other than an integer or before/after
    /// lists.
    #[error("{file}: stage entry `{entry}` must be an integer stage or before/after lists")]
    BadStageEntry {
        /// The descriptor file.
        file: PathBuf,
        /// The entry name.
        entry: String,
    },

    /// A list item that must be a scalar string was something else.
    #[error("{file}: `{key}` item is not a string: `{item}`")]
    NotAString {
        /// The descriptor file.
        file: PathBuf,
        /// The key whose item was rejected.
        key: String,
        /// Rendered form of the item.
        item: String,
    },

    /// Error from the underlying configuration tree.
    #[error(transparent)]
    Cct(#[from] CctError),

    /// A dependency reference failed to parse.
    #[error(transparent)]
    PkgRef(#[from] PkgRefError),

    /// Filesystem failure while reading a descriptor.
    #[error("failed to read {path}: {message}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// Rendered I/O error.
        message: String,
    },
}

impl PkgError {
    /// Wrap an I/O error with its path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
