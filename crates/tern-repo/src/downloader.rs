//! Downloader capability set.
//!
//! Everything the core needs from a version-control backend, as one
//! synchronous trait. Three implementers live in [`crate::git`]: GitHub
//! remotes, raw git URLs, and local copies. The specifics of transport are
//! opaque here; methods work by exit status and textual output.

use std::path::Path;
use thiserror::Error;

/// What kind of ref a string names in the backing repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// A branch head.
    Branch,
    /// A tag.
    Tag,
    /// A raw commit hash.
    Hash,
}

/// Downloader failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// The underlying command exited non-zero.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        /// The command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The command could not be spawned.
    #[error("failed to run `{command}`: {message}")]
    Spawn {
        /// The command line.
        command: String,
        /// Rendered I/O error.
        message: String,
    },

    /// Output that should have named a ref or hash was unusable.
    #[error("unexpected output from `{command}`: {output}")]
    BadOutput {
        /// The command line.
        command: String,
        /// The offending output.
        output: String,
    },

    /// The operation was aborted by the user.
    #[error("download aborted")]
    Aborted,
}

/// Synchronous version-control capability set.
pub trait Downloader: std::fmt::Debug + Send + Sync {
    /// Short human description of the remote (URL or path).
    fn remote(&self) -> String;

    /// The default branch of the remote.
    fn main_branch(&self) -> String {
        "master".to_string()
    }

    /// Clone the repository into `dest` and check out `commit`.
    fn clone_at(&self, commit: &str, dest: &Path) -> Result<(), DownloadError>;

    /// Fetch all remotes and tags in an existing working copy.
    fn fetch(&self, repo_dir: &Path) -> Result<(), DownloadError>;

    /// Check out `commit` in an existing working copy.
    fn checkout(&self, repo_dir: &Path, commit: &str) -> Result<(), DownloadError>;

    /// Contents of `file` as of `commit`, without touching the work tree.
    fn show_file(&self, repo_dir: &Path, commit: &str, file: &str)
    -> Result<String, DownloadError>;

    /// Full hash for a ref.
    fn hash_for(&self, repo_dir: &Path, reference: &str) -> Result<String, DownloadError>;

    /// Currently checked-out branch, or `None` for a detached head.
    fn current_branch(&self, repo_dir: &Path) -> Result<Option<String>, DownloadError>;

    /// Upstream tracking branch for `branch`, if configured.
    fn upstream_for(&self, repo_dir: &Path, branch: &str)
    -> Result<Option<String>, DownloadError>;

    /// Does the working copy have uncommitted changes?
    fn is_dirty(&self, repo_dir: &Path) -> Result<bool, DownloadError>;

    /// Classify a ref string.
    fn commit_kind(&self, repo_dir: &Path, reference: &str) -> Result<CommitKind, DownloadError>;

    /// Newest release-candidate branch on the remote, if any.
    fn latest_release_branch(&self, repo_dir: &Path) -> Result<Option<String>, DownloadError>;
}
