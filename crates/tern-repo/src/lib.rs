//! Repository layer for Tern.
//!
//! Holds everything between the project file and the package tree: the
//! per-repository metadata cache (version table, commit dependency lists,
//! tool-compatibility table, downloader handle), version normalization
//! against those tables, the `<repo, version>` dependency graph and its
//! solver, the downloader capability trait with its three git-backed
//! implementers, and the small on-disk surfaces (`version.yml`, the
//! installed-state file).

pub mod compat;
pub mod downloader;
pub mod error;
pub mod git;
pub mod graph;
pub mod project;
pub mod repository;
pub mod state;
pub mod versionfile;

pub use compat::{CompatSeverity, CompatTable};
pub use downloader::{CommitKind, DownloadError, Downloader};
pub use error::{MissingVersion, RepoError, RepoVersionConflict, SolveReport};
pub use git::{GitDownloader, GithubDownloader, LocalDownloader};
pub use graph::{GraphNode, RepoGraph, Solution};
pub use project::{Project, ProjectFile, RepoDescriptor, RepoKind};
pub use repository::{RepoDep, Repository};
pub use state::InstalledState;
pub use versionfile::parse_version_file;
