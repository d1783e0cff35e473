//! `tern upgrade`.
//!
//! Infer the requested version for every declared repository, solve the
//! repository dependency graph, and bring each working copy to its
//! selected version.

use crate::context::Context;
use crate::error::CliError;
use crate::output::ConsoleSink;
use clap::Args;
use std::collections::BTreeMap;
use tern_core::event::{Event, EventSink};
use tern_core::{Version, VersionReq};
use tern_repo::{InstalledState, RepoGraph, Solution};
use tracing::{info, warn};

/// Arguments for `tern upgrade`.
#[derive(Debug, Clone, Args)]
pub struct UpgradeArgs {
    /// Only show what would change.
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the upgrade pipeline.
pub fn run(ctx: &Context, args: &UpgradeArgs, sink: &ConsoleSink) -> Result<(), CliError> {
    let root_reqs = inferred_requirements(ctx)?;
    let graph = RepoGraph::build(ctx.project.repos(), &root_reqs);
    tracing::debug!(
        nodes = graph.version_node_count(),
        edges = graph.edge_count(),
        "repository graph built"
    );
    let solution = graph.solve()?;

    let mut state = ctx.project.state().clone();
    apply(ctx, args, sink, &solution, &mut state)?;

    if !args.dry_run {
        state.save(&ctx.project.root().join("project.state"))?;
    }
    Ok(())
}

/// The project's requirement sets with commit pins resolved through
/// `version.yml` or the version table, so the solver sees the same
/// normalized shapes the graph was built from.
fn inferred_requirements(ctx: &Context) -> Result<BTreeMap<String, Vec<VersionReq>>, CliError> {
    let root_reqs = ctx.project.file().root_requirements();

    // A pin stays a pin for the solver (it enters at high priority); the
    // inferred concrete version only informs diagnostics. A cycle through
    // chained version files surfaces here.
    for (name, reqs) in &root_reqs {
        let Some(repo) = ctx.project.repo(name) else {
            continue;
        };
        for req in reqs {
            let version = req.version();
            if !version.is_commit_pin() {
                continue;
            }
            let commit = version.commit().unwrap_or_default();
            let dir = ctx.project.repo_dir(name);
            let resolved = if dir.is_dir() {
                repo.version_at_commit(&dir, commit)?
            } else {
                repo.normalize(version)?
            };
            info!(repo = %name, commit, version = %resolved, "commit pin inferred");
        }
    }

    Ok(root_reqs)
}

/// Check out every selected version that differs from the installed state.
fn apply(
    ctx: &Context,
    args: &UpgradeArgs,
    sink: &ConsoleSink,
    solution: &Solution,
    state: &mut InstalledState,
) -> Result<(), CliError> {
    for (name, version) in &solution.versions {
        let installed = state.get(name);
        let wanted = version.to_string();
        if installed == Some(wanted.as_str()) {
            info!(repo = %name, version = %wanted, "already at requested version");
            continue;
        }

        println!(
            "{name}: {} -> {wanted}",
            installed.unwrap_or("(not installed)")
        );
        if args.dry_run {
            continue;
        }

        checkout(ctx, sink, name, version)?;
        state.set(name.clone(), wanted);
    }
    Ok(())
}

/// Bring one repository working copy to `version`.
fn checkout(
    ctx: &Context,
    sink: &ConsoleSink,
    name: &str,
    version: &Version,
) -> Result<(), CliError> {
    if ctx.abort.is_set() {
        return Err(CliError::other("upgrade aborted"));
    }

    let repo = ctx
        .project
        .repo(name)
        .ok_or_else(|| CliError::other(format!("repository `{name}` not loaded")))?;
    let downloader = repo
        .downloader()
        .ok_or_else(|| CliError::other(format!("repository `{name}` has no transport")))?;
    let commit = repo
        .commit_for(version)
        .ok_or_else(|| CliError::other(format!("no commit recorded for {name} {version}")))?
        .to_string();

    let dir = ctx.project.repo_dir(name);
    sink.emit(&Event::DownloadStarted {
        repo: name.to_string(),
        commit: commit.clone(),
    });

    if dir.is_dir() {
        if downloader.is_dirty(&dir).map_err(tern_repo::RepoError::from)? {
            if ctx.force {
                warn!(repo = %name, "working copy is dirty; --force overrides");
            } else {
                return Err(CliError::other(format!(
                    "repository `{name}` has uncommitted changes (use --force to override)"
                )));
            }
        }
        downloader
            .fetch(&dir)
            .map_err(tern_repo::RepoError::from)?;
        downloader
            .checkout(&dir, &commit)
            .map_err(tern_repo::RepoError::from)?;
    } else {
        downloader
            .clone_at(&commit, &dir)
            .map_err(tern_repo::RepoError::from)?;
    }

    sink.emit(&Event::DownloadFinished {
        repo: name.to_string(),
    });
    Ok(())
}
