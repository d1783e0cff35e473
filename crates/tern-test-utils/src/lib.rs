//! Temp-project fixtures for integration tests.
//!
//! Builds disposable project trees on disk: a `project.yml`, installed
//! repositories under `repos/`, and packages anywhere below the root.
//! Everything is removed when the fixture drops.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A disposable on-disk project.
#[derive(Debug)]
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    /// A project with a minimal `project.yml` naming it `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let this = Self {
            dir: TempDir::new().expect("temp dir"),
        };
        this.write("project.yml", &format!("project.name: {name}\n"));
        this
    }

    /// A project with the given `project.yml` contents.
    #[must_use]
    pub fn with_project_yml(text: &str) -> Self {
        let this = Self {
            dir: TempDir::new().expect("temp dir"),
        };
        this.write("project.yml", text);
        this
    }

    /// Project root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file below the root, creating parent directories.
    pub fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().expect("file has a parent")).expect("mkdir");
        std::fs::write(&path, text).expect("write fixture file");
        path
    }

    /// Add a package at `rel_dir` with the given `pkg.yml` contents.
    pub fn add_package(&self, rel_dir: &str, pkg_yml: &str) {
        self.write(&format!("{rel_dir}/pkg.yml"), pkg_yml);
    }

    /// Add a `syscfg.yml` next to an existing package.
    pub fn add_syscfg(&self, rel_dir: &str, syscfg_yml: &str) {
        self.write(&format!("{rel_dir}/syscfg.yml"), syscfg_yml);
    }

    /// Install a repository under `repos/` with the given
    /// `repository.yml` contents.
    pub fn add_repo(&self, name: &str, repository_yml: &str) {
        self.write(&format!("repos/{name}/repository.yml"), repository_yml);
    }

    /// Add a package inside an installed repository.
    pub fn add_repo_package(&self, repo: &str, rel_dir: &str, pkg_yml: &str) {
        self.write(&format!("repos/{repo}/{rel_dir}/pkg.yml"), pkg_yml);
    }
}
