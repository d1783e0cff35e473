//! `tern build <target>`.

use crate::context::Context;
use crate::error::CliError;
use crate::output::ConsoleSink;
use clap::Args;
use std::fmt::Write as _;
use std::process::Command;
use tern_build::{CompileJob, CompilerConfig, JobPool, collect_jobs};
use tern_expr::EMPTY_ENV;
use tern_pkg::PkgType;
use tern_resolver::Resolution;
use tracing::{debug, info};

/// Arguments for `tern build`.
#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Target to build.
    pub target: String,

    /// Worker count; defaults to the virtual CPU count.
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Resolve the target, emit the generated init/down sources, and run the
/// compile-job stream through the worker pool.
pub fn run(ctx: &Context, args: &BuildArgs, sink: &ConsoleSink) -> Result<(), CliError> {
    let target = ctx.find_target(&args.target)?;
    let resolution = ctx.resolve_target(&target, sink)?;

    let out_dir = ctx
        .project
        .root()
        .join("bin")
        .join(target.short_name())
        .join("generated");
    emit_staged_sources(&resolution, &out_dir)?;

    for cmd in &resolution.pre_build_order {
        info!(cmd = %cmd.name, pkg = %cmd.pkg, "pre-build command");
    }

    let config = compiler_config(&resolution)?;
    let jobs = collect_jobs(&resolution, &config);
    info!(jobs = jobs.len(), "compiling");

    let mut pool = JobPool::new()
        .with_abort(ctx.abort.clone())
        .with_events(sink);
    if let Some(jobs_override) = args.jobs {
        pool = pool.with_workers(jobs_override);
    }
    pool.run(&jobs, |job| compile_one(job, &out_dir))
        .map_err(|e| CliError::other(e.to_string()))?;

    for cmd in resolution
        .pre_link_order
        .iter()
        .chain(&resolution.post_link_order)
    {
        info!(cmd = %cmd.name, pkg = %cmd.pkg, "link-phase command");
    }

    println!("Target {} built successfully", target);
    Ok(())
}

/// Compiler settings from the resolution's compiler package.
fn compiler_config(resolution: &Resolution) -> Result<CompilerConfig, CliError> {
    let compiler = resolution
        .pkgs
        .iter()
        .find(|p| p.ptype() == PkgType::Compiler)
        .ok_or_else(|| CliError::other("resolution contains no compiler package"))?;

    let command = compiler
        .cct()
        .scalar("compiler.path.cc", &EMPTY_ENV)
        .map_err(tern_pkg::PkgError::from)?
        .and_then(|v| v.as_str().ok())
        .unwrap_or_else(|| "cc".to_string());
    let cflags = compiler.cflags(&resolution.syscfg)?;

    Ok(CompilerConfig { command, cflags })
}

/// Run one compile job, placing the object next to the generated tree.
fn compile_one(job: &CompileJob, out_dir: &std::path::Path) -> Result<(), String> {
    let obj_dir = out_dir.join("obj");
    std::fs::create_dir_all(&obj_dir).map_err(|e| e.to_string())?;
    let stem = job
        .source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    let obj = obj_dir.join(format!("{stem}.o"));

    debug!(source = %job.source.display(), "compiling");
    let output = Command::new(&job.config.command)
        .args(&job.config.cflags)
        .arg("-c")
        .arg(&job.source)
        .arg("-o")
        .arg(&obj)
        .output()
        .map_err(|e| e.to_string())?;
    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

/// Write the generated init and shutdown sources, calls ordered by the
/// staged-function ordering.
fn emit_staged_sources(resolution: &Resolution, out_dir: &std::path::Path) -> Result<(), CliError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| CliError::other(format!("cannot create {}: {e}", out_dir.display())))?;

    let mut init_src = String::new();
    let _ = writeln!(init_src, "/* Generated by tern; do not edit. */");
    for entry in &resolution.init_order {
        let _ = writeln!(init_src, "extern void {}(void);", entry.name);
    }
    let _ = writeln!(init_src, "\nvoid tern_sysinit(void) {{");
    for entry in &resolution.init_order {
        let _ = writeln!(init_src, "    {}();    /* {} */", entry.name, entry.pkg);
    }
    let _ = writeln!(init_src, "}}");
    write_source(out_dir, "tern_sysinit.c", &init_src)?;

    let mut down_src = String::new();
    let _ = writeln!(down_src, "/* Generated by tern; do not edit. */");
    for entry in &resolution.down_order {
        let _ = writeln!(down_src, "extern void {}(void);", entry.name);
    }
    let _ = writeln!(down_src, "\nvoid tern_sysdown(void) {{");
    for entry in &resolution.down_order {
        let _ = writeln!(down_src, "    {}();    /* {} */", entry.name, entry.pkg);
    }
    let _ = writeln!(down_src, "}}");
    write_source(out_dir, "tern_sysdown.c", &down_src)?;

    Ok(())
}

fn write_source(dir: &std::path::Path, name: &str, text: &str) -> Result<(), CliError> {
    let path = dir.join(name);
    std::fs::write(&path, text)
        .map_err(|e| CliError::other(format!("cannot write {}: {e}", path.display())))
}
