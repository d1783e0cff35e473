//! `tern info`.

use crate::context::Context;
use crate::error::CliError;
use crate::output::table;
use clap::Args;
use tern_core::pkgref::PROJECT_REPO;

/// Arguments for `tern info`.
#[derive(Debug, Clone, Args)]
pub struct InfoArgs {
    /// Also list every package per repository.
    #[arg(long)]
    pub packages: bool,
}

/// Show repositories, their requirements, and the installed state.
pub fn run(ctx: &Context, args: &InfoArgs) -> Result<(), CliError> {
    println!("Project: {}", ctx.project.file().name);

    let mut repo_table = table(&["repository", "requirement", "installed", "versions"]);
    for (name, repo) in ctx.project.repos() {
        let requirement = ctx
            .project
            .file()
            .descriptors
            .get(name)
            .map(|d| {
                d.reqs
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let installed = ctx.project.state().get(name).unwrap_or("-");
        repo_table.add_row(vec![
            name.clone(),
            requirement,
            installed.to_string(),
            repo.versions().len().to_string(),
        ]);
    }
    println!("{repo_table}");

    if args.packages {
        let mut pkg_table = table(&["package", "type"]);
        for pkg in ctx.index.iter() {
            pkg_table.add_row(vec![pkg.name().to_string(), pkg.ptype().to_string()]);
        }
        println!("{pkg_table}");
    } else {
        let local = ctx
            .index
            .iter()
            .filter(|p| p.name().repo() == PROJECT_REPO)
            .count();
        println!(
            "{} packages indexed ({local} project-local)",
            ctx.index.len()
        );
    }

    Ok(())
}
