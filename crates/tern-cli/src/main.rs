//! Tern CLI entry point.
//!
//! Exit codes: 0 success, 1 resolution failure, 2 configuration or I/O
//! failure.

mod commands;
mod context;
mod error;
mod output;

use clap::Parser;
use commands::{Cli, Commands, PkgCmd, TargetCmd};
use context::Context;
use error::CliError;
use output::ConsoleSink;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let sink = ConsoleSink::new(cli.quiet);
    let ctx = Context::load(&cli.project_dir, cli.force, cli.assume_yes)?;

    match &cli.command {
        Commands::Build(args) => commands::build::run(&ctx, args, &sink),
        Commands::Upgrade(args) => commands::upgrade::run(&ctx, args, &sink),
        Commands::Info(args) => commands::info::run(&ctx, args),
        Commands::Target(TargetCmd::Show(args)) => commands::target_show::run(&ctx, args, &sink),
        Commands::Pkg(PkgCmd::New(args)) => commands::pkg_new::run(&ctx, args),
    }
}
