//! `tern pkg new <path>`.

use crate::context::Context;
use crate::error::CliError;
use clap::Args;
use tern_pkg::PkgType;

/// Arguments for `tern pkg new`.
#[derive(Debug, Clone, Args)]
pub struct PkgNewArgs {
    /// Path of the new package, relative to the project root.
    pub path: String,

    /// Package type.
    #[arg(long, default_value = "lib")]
    pub r#type: String,
}

/// Scaffold a new package directory with a descriptor and a stub source.
pub fn run(ctx: &Context, args: &PkgNewArgs) -> Result<(), CliError> {
    let ptype: PkgType = args
        .r#type
        .parse()
        .map_err(|found| CliError::other(format!("unknown package type `{found}`")))?;

    let rel = args.path.trim_matches('/');
    if rel.is_empty() {
        return Err(CliError::other("package path must not be empty"));
    }
    let dir = ctx.project.root().join(rel);
    if dir.join("pkg.yml").exists() {
        return Err(CliError::other(format!(
            "package already exists at {}",
            dir.display()
        )));
    }

    let short = rel.rsplit('/').next().unwrap_or(rel);
    let mkdir = |p: &std::path::Path| {
        std::fs::create_dir_all(p)
            .map_err(|e| CliError::other(format!("cannot create {}: {e}", p.display())))
    };
    mkdir(&dir.join("src"))?;
    mkdir(&dir.join("include").join(short))?;

    let descriptor = format!(
        "pkg.name: {rel}\npkg.type: {ptype}\npkg.description:\npkg.author:\npkg.deps:\n"
    );
    std::fs::write(dir.join("pkg.yml"), descriptor)
        .map_err(|e| CliError::other(format!("cannot write pkg.yml: {e}")))?;

    let stub = format!("#include \"{short}/{short}.h\"\n");
    std::fs::write(dir.join("src").join(format!("{short}.c")), stub)
        .map_err(|e| CliError::other(format!("cannot write stub source: {e}")))?;
    std::fs::write(
        dir.join("include").join(short).join(format!("{short}.h")),
        "#pragma once\n",
    )
    .map_err(|e| CliError::other(format!("cannot write stub header: {e}")))?;

    println!("Created {ptype} package at {}", dir.display());
    Ok(())
}
