//! Command-line surface.

pub mod build;
pub mod info;
pub mod pkg_new;
pub mod target_show;
pub mod upgrade;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Tern: build and package management for embedded projects.
#[derive(Debug, Parser)]
#[command(name = "tern", version, about)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Proceed past warnings that would otherwise stop the command.
    #[arg(long, global = true)]
    pub force: bool,

    /// Assume yes for every prompt.
    #[arg(short = 'y', long = "yes", global = true)]
    pub assume_yes: bool,

    /// Project directory.
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve and build a target.
    Build(build::BuildArgs),
    /// Upgrade installed repositories to the versions the project requires.
    Upgrade(upgrade::UpgradeArgs),
    /// Show repositories, requirements, and installed state.
    Info(info::InfoArgs),
    /// Target inspection.
    #[command(subcommand)]
    Target(TargetCmd),
    /// Package scaffolding.
    #[command(subcommand)]
    Pkg(PkgCmd),
}

/// `tern target ...`
#[derive(Debug, Subcommand)]
pub enum TargetCmd {
    /// Show a target's resolved packages and flattened syscfg.
    Show(target_show::TargetShowArgs),
}

/// `tern pkg ...`
#[derive(Debug, Subcommand)]
pub enum PkgCmd {
    /// Scaffold a new package.
    New(pkg_new::PkgNewArgs),
}
