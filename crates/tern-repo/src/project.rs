//! Project context.
//!
//! The explicit handle threaded through every subsystem: the parsed
//! `project.yml`, the loaded repository metadata, and the installed-state
//! file. There is no process-wide project; tests construct isolated
//! projects and drop them.

use crate::compat::CompatTable;
use crate::downloader::Downloader;
use crate::error::RepoError;
use crate::git::{GitDownloader, GithubDownloader, LocalDownloader};
use crate::repository::Repository;
use crate::state::InstalledState;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tern_core::{Value, VersionReq};

/// Transport used to reach a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoKind {
    /// GitHub-hosted.
    Github {
        /// Owning user or organization.
        user: String,
        /// Repository name on GitHub.
        repo: String,
        /// Optional access token.
        token: Option<String>,
    },
    /// Arbitrary git URL.
    Git {
        /// Clone URL.
        url: String,
    },
    /// Local filesystem copy.
    Local {
        /// Path to the repository.
        path: PathBuf,
    },
}

/// One `repository.<name>` block from `project.yml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    /// Repository name.
    pub name: String,
    /// Transport.
    pub kind: RepoKind,
    /// Requested version requirement set.
    pub reqs: Vec<VersionReq>,
    /// Remaining fields, passed through untouched.
    pub fields: BTreeMap<String, String>,
}

impl RepoDescriptor {
    /// Build the downloader for this repository's transport.
    #[must_use]
    pub fn make_downloader(&self) -> Box<dyn Downloader> {
        match &self.kind {
            RepoKind::Github { user, repo, token } => {
                Box::new(GithubDownloader::new(user, repo, token.as_deref()))
            }
            RepoKind::Git { url } => Box::new(GitDownloader::new(url.clone())),
            RepoKind::Local { path } => Box::new(LocalDownloader::new(path)),
        }
    }
}

/// Parsed `project.yml`.
#[derive(Debug, Clone, Default)]
pub struct ProjectFile {
    /// Project name.
    pub name: String,
    /// Repositories the project declares, in declaration order.
    pub repositories: Vec<String>,
    /// Per-repository descriptors.
    pub descriptors: BTreeMap<String, RepoDescriptor>,
    /// Directory names excluded from package discovery.
    pub ignore_dirs: Vec<String>,
    /// Tool-compatibility table for the project itself.
    pub compat: CompatTable,
}

impl ProjectFile {
    /// Parse a `project.yml` document.
    pub fn from_yaml_str(file: &Path, text: &str) -> Result<Self, RepoError> {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| RepoError::MalformedDescriptor {
                file: file.to_path_buf(),
                reason: e.to_string(),
            })?;
        let doc = Value::from_yaml(parsed).map_err(|e| RepoError::MalformedDescriptor {
            file: file.to_path_buf(),
            reason: e.to_string(),
        })?;
        let malformed = |reason: String| RepoError::MalformedDescriptor {
            file: file.to_path_buf(),
            reason,
        };

        let name = doc
            .get("project.name")
            .and_then(|v| v.as_str().ok())
            .ok_or_else(|| malformed("missing `project.name`".to_string()))?;

        let repositories = match doc.get("project.repositories") {
            Some(value) => value
                .as_sequence()
                .map_err(|e| malformed(format!("`project.repositories`: {e}")))?
                .iter()
                .filter_map(|v| v.as_str().ok())
                .collect(),
            None => Vec::new(),
        };

        let ignore_dirs = match doc.get("project.ignore_dirs") {
            Some(value) => value
                .as_sequence()
                .map_err(|e| malformed(format!("`project.ignore_dirs`: {e}")))?
                .iter()
                .filter_map(|v| v.as_str().ok())
                .collect(),
            None => Vec::new(),
        };

        let compat = doc
            .get("project.newt_compatibility")
            .map(CompatTable::from_value)
            .unwrap_or_default();

        let mut descriptors = BTreeMap::new();
        let entries = doc.as_mapping().map_err(|e| malformed(e.to_string()))?;
        for (key, value) in entries {
            let Some(repo_name) = key.strip_prefix("repository.") else {
                continue;
            };
            let descriptor = Self::parse_descriptor(file, repo_name, value)?;
            descriptors.insert(repo_name.to_string(), descriptor);
        }

        Ok(Self {
            name,
            repositories,
            descriptors,
            ignore_dirs,
            compat,
        })
    }

    fn parse_descriptor(
        file: &Path,
        name: &str,
        value: &Value,
    ) -> Result<RepoDescriptor, RepoError> {
        let malformed = |reason: String| RepoError::MalformedDescriptor {
            file: file.to_path_buf(),
            reason,
        };
        let entries = value
            .as_mapping()
            .map_err(|e| malformed(format!("`repository.{name}`: {e}")))?;

        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        for (k, v) in entries {
            if let Ok(text) = v.as_str() {
                fields.insert(k.clone(), text);
            }
        }

        let kind_name = fields
            .remove("type")
            .ok_or_else(|| malformed(format!("`repository.{name}` missing `type`")))?;
        let kind = match kind_name.as_str() {
            "github" => {
                let user = fields
                    .remove("user")
                    .ok_or_else(|| malformed(format!("`repository.{name}` missing `user`")))?;
                let repo = fields
                    .remove("repo")
                    .ok_or_else(|| malformed(format!("`repository.{name}` missing `repo`")))?;
                RepoKind::Github {
                    user,
                    repo,
                    token: fields.remove("token"),
                }
            }
            "git" => RepoKind::Git {
                url: fields
                    .remove("url")
                    .ok_or_else(|| malformed(format!("`repository.{name}` missing `url`")))?,
            },
            "local" => RepoKind::Local {
                path: PathBuf::from(fields.remove("path").ok_or_else(|| {
                    malformed(format!("`repository.{name}` missing `path`"))
                })?),
            },
            other => {
                return Err(malformed(format!(
                    "`repository.{name}` has unknown type `{other}`"
                )));
            }
        };

        let reqs = match fields.remove("vers") {
            Some(text) => VersionReq::parse_list(&text)?,
            None => Vec::new(),
        };

        Ok(RepoDescriptor {
            name: name.to_string(),
            kind,
            reqs,
            fields,
        })
    }

    /// The project's root requirement sets, for graph construction.
    #[must_use]
    pub fn root_requirements(&self) -> BTreeMap<String, Vec<VersionReq>> {
        self.descriptors
            .iter()
            .filter(|(name, _)| self.repositories.contains(name))
            .map(|(name, d)| (name.clone(), d.reqs.clone()))
            .collect()
    }
}

/// A loaded project: file, repositories, installed state.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    file: ProjectFile,
    repos: BTreeMap<String, Repository>,
    state: InstalledState,
}

impl Project {
    /// Load a project from its root directory.
    ///
    /// Reads `project.yml`, then the `repository.yml` of every installed
    /// repository under `repos/`; repositories that are declared but not
    /// yet installed load as empty metadata. Downloader handles come from
    /// the project file's transport blocks.
    pub fn load(root: &Path) -> Result<Self, RepoError> {
        let project_yml = root.join("project.yml");
        let text =
            std::fs::read_to_string(&project_yml).map_err(|e| RepoError::io(&project_yml, &e))?;
        let file = ProjectFile::from_yaml_str(&project_yml, &text)?;

        let mut repos = BTreeMap::new();
        for name in &file.repositories {
            let dir = root.join("repos").join(name);
            let mut repo = if dir.join("repository.yml").is_file() {
                Repository::load(&dir)?
            } else {
                tracing::debug!(repo = %name, "repository not installed; empty metadata");
                Repository::new(name.clone())
            };
            if let Some(descriptor) = file.descriptors.get(name) {
                repo.set_downloader(descriptor.make_downloader());
            }
            repos.insert(name.clone(), repo);
        }

        let state = InstalledState::load(&root.join("project.state"))?;

        Ok(Self {
            root: root.to_path_buf(),
            file,
            repos,
            state,
        })
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The parsed project file.
    #[must_use]
    pub const fn file(&self) -> &ProjectFile {
        &self.file
    }

    /// Loaded repositories.
    #[must_use]
    pub const fn repos(&self) -> &BTreeMap<String, Repository> {
        &self.repos
    }

    /// One repository by name.
    #[must_use]
    pub fn repo(&self, name: &str) -> Option<&Repository> {
        self.repos.get(name)
    }

    /// The installed-state file contents.
    #[must_use]
    pub const fn state(&self) -> &InstalledState {
        &self.state
    }

    /// Working-copy directory of a repository.
    #[must_use]
    pub fn repo_dir(&self, name: &str) -> PathBuf {
        self.root.join("repos").join(name)
    }
}
