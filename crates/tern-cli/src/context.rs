//! Command context: the loaded project and its package index.

use crate::error::CliError;
use std::path::Path;
use std::sync::LazyLock;
use tern_core::pkgref::PROJECT_REPO;
use tern_core::{AbortFlag, PkgRef, Version};
use tern_expr::EMPTY_ENV;
use tern_pkg::{PackageIndex, PkgType, discover};
use tern_repo::{CompatSeverity, Project};
use tern_resolver::{Resolution, Resolver};

/// The running tool's version, for compatibility tables.
pub static TOOL_VERSION: LazyLock<Version> = LazyLock::new(|| {
    Version::parse(env!("CARGO_PKG_VERSION")).expect("crate version parses")
});

/// Everything a command needs: project, package index, shared flags.
#[derive(Debug)]
pub struct Context {
    /// The loaded project.
    pub project: Project,
    /// Index of every package in the project and its installed repos.
    pub index: PackageIndex,
    /// Cooperative cancellation flag.
    pub abort: AbortFlag,
    /// `--force`.
    pub force: bool,
    /// `--yes`.
    pub assume_yes: bool,
}

impl Context {
    /// Load the project at `root` and index all of its packages.
    pub fn load(root: &Path, force: bool, assume_yes: bool) -> Result<Self, CliError> {
        let project = Project::load(root)?;

        check_compat("project", project.file().compat.check(&TOOL_VERSION), force)?;
        for (name, repo) in project.repos() {
            check_compat(name, repo.compat().check(&TOOL_VERSION), force)?;
        }

        let mut index = PackageIndex::new();

        // Project-local packages; the repos working copies are indexed
        // under their own repository ids below.
        let mut ignore = project.file().ignore_dirs.clone();
        ignore.push("repos".to_string());
        ignore.push("bin".to_string());
        for pkg in discover(root, PROJECT_REPO, &ignore)? {
            index.insert(pkg);
        }

        for name in project.repos().keys() {
            let dir = project.repo_dir(name);
            if !dir.is_dir() {
                continue;
            }
            for pkg in discover(&dir, name, &project.file().ignore_dirs)? {
                index.insert(pkg);
            }
        }

        tracing::info!(
            packages = index.len(),
            repos = project.repos().len(),
            "project loaded"
        );

        Ok(Self {
            project,
            index,
            abort: AbortFlag::new(),
            force,
            assume_yes,
        })
    }

    /// Find a target package by its short name or full path.
    pub fn find_target(&self, name: &str) -> Result<PkgRef, CliError> {
        let direct = PkgRef::new(PROJECT_REPO, format!("targets/{name}"));
        if self.index.contains(&direct) {
            return Ok(direct);
        }
        let by_path = PkgRef::new(PROJECT_REPO, name);
        if self.index.contains(&by_path) {
            return Ok(by_path);
        }
        Err(CliError::other(format!("target `{name}` not found")))
    }

    /// The seed set for a build of `target`: the target itself, its app,
    /// its bsp, and the bsp's compiler.
    pub fn seeds_for_target(&self, target: &PkgRef) -> Result<Vec<PkgRef>, CliError> {
        let target_pkg = self
            .index
            .get(target)
            .ok_or_else(|| CliError::other(format!("target `{target}` not found")))?;
        if target_pkg.ptype() != PkgType::Target {
            return Err(CliError::other(format!(
                "`{target}` is a {} package, not a target",
                target_pkg.ptype()
            )));
        }

        let mut seeds = vec![target.clone()];

        let app = target_pkg.target_app(&EMPTY_ENV)?;
        if let Some(app) = &app {
            seeds.push(app.clone());
        }

        let bsp = target_pkg
            .target_bsp(&EMPTY_ENV)?
            .ok_or_else(|| CliError::other(format!("target `{target}` sets no bsp")))?;
        seeds.push(bsp.clone());

        let bsp_pkg = self
            .index
            .get(&bsp)
            .ok_or_else(|| CliError::other(format!("bsp `{bsp}` not found")))?;
        let compiler = bsp_pkg
            .bsp_compiler(&EMPTY_ENV)?
            .ok_or_else(|| CliError::other(format!("bsp `{bsp}` names no compiler")))?;
        seeds.push(compiler);

        Ok(seeds)
    }

    /// Resolve a target's package closure.
    pub fn resolve_target(
        &self,
        target: &PkgRef,
        events: &dyn tern_core::event::EventSink,
    ) -> Result<Resolution, CliError> {
        let seeds = self.seeds_for_target(target)?;
        let resolution = Resolver::new(&self.index)
            .with_abort(self.abort.clone())
            .with_events(events)
            .resolve(&seeds)?;
        Ok(resolution)
    }
}

/// Enforce a compatibility verdict. Warnings log; errors stop the command
/// unless `--force` downgrades them.
fn check_compat(who: &str, severity: CompatSeverity, force: bool) -> Result<(), CliError> {
    match severity {
        CompatSeverity::Good => Ok(()),
        CompatSeverity::Warn => {
            tracing::warn!(
                source = who,
                tool = %*TOOL_VERSION,
                "compatibility table does not cover this tern version"
            );
            Ok(())
        }
        CompatSeverity::Error if force => {
            tracing::warn!(
                source = who,
                "compatibility table rejects this tern version; continuing due to --force"
            );
            Ok(())
        }
        CompatSeverity::Error => Err(CliError::other(format!(
            "`{who}` declares this tern version incompatible (use --force to override)"
        ))),
    }
}
