//! Repository-layer errors.

use std::path::PathBuf;
use tern_core::{Version, VersionError, VersionReq};
use thiserror::Error;

/// A conflict between two requirements on the same repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoVersionConflict {
    /// The repository both sides constrain.
    pub repo: String,
    /// The version already selected.
    pub existing: Version,
    /// The version the new requirement demands.
    pub proposed: Version,
    /// Human-readable requirement chains for both sides.
    pub witnesses: Vec<String>,
}

impl std::fmt::Display for RepoVersionConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "repository `{}`: {} conflicts with {}",
            self.repo, self.existing, self.proposed
        )?;
        for witness in &self.witnesses {
            writeln!(f, "    {witness}")?;
        }
        Ok(())
    }
}

/// A requirement set with no satisfying version in the target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingVersion {
    /// The repository constrained.
    pub repo: String,
    /// The unsatisfiable requirement set.
    pub reqs: Vec<VersionReq>,
    /// Who imposed the requirements.
    pub required_by: String,
}

impl std::fmt::Display for MissingVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "repository `{}`: no version satisfies [{}] (required by {})",
            self.repo,
            self.reqs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            self.required_by
        )
    }
}

/// Every independent failure the version solver found in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveReport {
    /// Two-sided requirement conflicts.
    pub conflicts: Vec<RepoVersionConflict>,
    /// Requirements no version satisfies.
    pub missing: Vec<MissingVersion>,
}

impl SolveReport {
    /// Did the solve fail?
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.conflicts.is_empty() || !self.missing.is_empty()
    }
}

impl std::fmt::Display for SolveReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for conflict in &self.conflicts {
            writeln!(f, "{conflict}")?;
        }
        for missing in &self.missing {
            writeln!(f, "{missing}")?;
        }
        Ok(())
    }
}

/// Errors from repository metadata, the version graph, and the downloader.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A requirement names a version no table entry satisfies.
    #[error("{0}")]
    VersionNotAvailable(MissingVersion),

    /// The version solver failed; the report carries every independent
    /// failure found in the pass.
    #[error("repository resolution failed:\n{report}")]
    SolveFailed {
        /// The accumulated failure report.
        report: SolveReport,
    },

    /// Resolving a commit pin through version files looped.
    #[error("repository `{repo}`: commit pin `{commit}` resolves in a cycle")]
    CommitPinCycle {
        /// The repository involved.
        repo: String,
        /// The commit that started the loop.
        commit: String,
    },

    /// A `repository.yml` was structurally invalid.
    #[error("{file}: {reason}")]
    MalformedDescriptor {
        /// The offending file.
        file: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// The installed-state file could not be parsed.
    #[error("{file}: state file corrupt at line {line}: `{text}`")]
    StateFileCorruption {
        /// The offending file.
        file: PathBuf,
        /// 1-based line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A version string failed to parse or normalize.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// The downloader failed.
    #[error(transparent)]
    Download(#[from] crate::downloader::DownloadError),

    /// Filesystem failure.
    #[error("failed to read {path}: {message}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// Rendered I/O error.
        message: String,
    },
}

impl RepoError {
    /// Wrap an I/O error with its path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
