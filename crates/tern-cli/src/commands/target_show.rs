//! `tern target show <name>`.

use crate::context::Context;
use crate::error::CliError;
use crate::output::{ConsoleSink, table};
use clap::Args;
use owo_colors::OwoColorize;

/// Arguments for `tern target show`.
#[derive(Debug, Clone, Args)]
pub struct TargetShowArgs {
    /// Target name or path.
    pub name: String,

    /// Also print override history per setting.
    #[arg(long)]
    pub history: bool,
}

/// Resolve the target and dump its package set and flattened syscfg with
/// provenance.
pub fn run(ctx: &Context, args: &TargetShowArgs, sink: &ConsoleSink) -> Result<(), CliError> {
    let target = ctx.find_target(&args.name)?;
    let resolution = ctx.resolve_target(&target, sink)?;

    println!("{}", format!("target {target}").bold());

    let mut pkg_table = table(&["package", "type"]);
    for pkg in &resolution.pkgs {
        pkg_table.add_row(vec![pkg.name().to_string(), pkg.ptype().to_string()]);
    }
    println!("{pkg_table}");

    if !resolution.api_bindings.is_empty() {
        let mut api_table = table(&["api", "supplier"]);
        for (api, supplier) in &resolution.api_bindings {
            api_table.add_row(vec![api.clone(), supplier.to_string()]);
        }
        println!("{api_table}");
    }

    let mut cfg_table = table(&["setting", "value", "defined by"]);
    for setting in resolution.syscfg.iter() {
        cfg_table.add_row(vec![
            setting.name.clone(),
            setting.value.clone(),
            setting.defining_pkg.to_string(),
        ]);
    }
    println!("{cfg_table}");

    if args.history {
        for setting in resolution.syscfg.iter() {
            if setting.history.is_empty() {
                continue;
            }
            println!("{}", setting.name.bold());
            println!("    {} (default)", setting.default);
            for over in &setting.history {
                println!("    {} <- {}", over.value, over.pkg);
            }
        }
    }

    Ok(())
}
