//! CLI error type and exit-code mapping.
//!
//! Exit codes: 0 success, 1 resolution failure, 2 configuration or I/O
//! failure.

use tern_core::VersionError;
use tern_pkg::PkgError;
use tern_repo::RepoError;
use tern_resolver::ResolveError;
use thiserror::Error;

/// Any failure a command can surface.
#[derive(Debug, Error)]
pub enum CliError {
    /// Package resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Repository layer failed.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// Package loading failed.
    #[error(transparent)]
    Pkg(#[from] PkgError),

    /// Version parsing or normalization failed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Anything else; always a configuration/IO failure.
    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Resolve(_) => 1,
            Self::Repo(err) => match err {
                RepoError::SolveFailed { .. }
                | RepoError::VersionNotAvailable(_)
                | RepoError::CommitPinCycle { .. }
                | RepoError::Version(_) => 1,
                _ => 2,
            },
            Self::Pkg(_) | Self::Version(_) | Self::Other(_) => 2,
        }
    }

    /// A configuration failure with a custom message.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
