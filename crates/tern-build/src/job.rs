//! Compile jobs derived from a resolution.

use std::path::PathBuf;
use tern_resolver::Resolution;
use walkdir::WalkDir;

/// Compiler configuration attached to every job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompilerConfig {
    /// Compiler command.
    pub command: String,
    /// Flags, package flags appended after target-wide ones.
    pub cflags: Vec<String>,
}

/// One source file to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    /// Source file path.
    pub source: PathBuf,
    /// Compiler configuration for this file.
    pub config: CompilerConfig,
}

/// Source-file extensions the build compiles.
const SOURCE_EXTENSIONS: &[&str] = &["c", "s", "S"];

/// Collect the compile-job stream for a resolution.
///
/// Walks each resolved package's `src/` directory in canonical package
/// order, with files sorted within each package, so the stream is a
/// deterministic function of the resolution.
#[must_use]
pub fn collect_jobs(resolution: &Resolution, base_config: &CompilerConfig) -> Vec<CompileJob> {
    let mut jobs = Vec::new();

    for pkg in &resolution.pkgs {
        if pkg.root().as_os_str().is_empty() {
            continue;
        }
        let src_dir = pkg.root().join("src");
        if !src_dir.is_dir() {
            continue;
        }

        let mut config = base_config.clone();
        if let Ok(extra) = pkg.cflags(&resolution.syscfg) {
            config.cflags.extend(extra);
        }

        let mut sources: Vec<PathBuf> = WalkDir::new(&src_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
            })
            .collect();
        sources.sort();

        jobs.extend(sources.into_iter().map(|source| CompileJob {
            source,
            config: config.clone(),
        }));
    }

    jobs
}
