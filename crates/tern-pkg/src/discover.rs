//! On-disk package discovery.

use crate::error::PkgError;
use crate::package::Package;
use std::path::Path;
use tern_core::PkgRef;
use walkdir::WalkDir;

/// Find and load every package under `root`, assigning canonical
/// references in `repo`.
///
/// A package is any directory containing a `pkg.yml`. Hidden directories
/// and any directory whose name appears in `ignore_dirs` are not entered.
/// Results are sorted by canonical reference.
pub fn discover(root: &Path, repo: &str, ignore_dirs: &[String]) -> Result<Vec<Package>, PkgError> {
    let mut packages = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if entry.depth() > 0 && name.starts_with('.') {
                return false;
            }
            !ignore_dirs.iter().any(|ignored| ignored == name.as_ref())
        });

    for entry in walker {
        let entry = entry.map_err(|e| PkgError::Io {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        if !dir.join("pkg.yml").is_file() {
            continue;
        }

        let rel = dir
            .strip_prefix(root)
            .expect("walkdir entries stay under root");
        let rel_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if rel_path.is_empty() {
            // A pkg.yml at the repository root is not a package.
            continue;
        }

        let name = PkgRef::new(repo, rel_path);
        tracing::debug!(pkg = %name, dir = %dir.display(), "loading package");
        packages.push(Package::load(dir, name)?);
    }

    packages.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn finds_nested_packages() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "sys/log/pkg.yml", "pkg.name: sys/log\n");
        write(temp.path(), "hw/bsp/native/pkg.yml", "pkg.type: bsp\n");
        write(temp.path(), "hw/bsp/native/bsp.yml", "bsp.compiler: compiler/sim\n");
        write(temp.path(), "docs/readme.txt", "not a package\n");

        let pkgs = discover(temp.path(), "core", &[]).unwrap();
        let names: Vec<String> = pkgs.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["@core/hw/bsp/native", "@core/sys/log"]);
    }

    #[test]
    fn honors_ignore_dirs_and_hidden() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "bin/skip/pkg.yml", "pkg.name: skip\n");
        write(temp.path(), ".git/pkg.yml", "pkg.name: hidden\n");
        write(temp.path(), "keep/pkg.yml", "pkg.name: keep\n");

        let pkgs = discover(temp.path(), "core", &["bin".to_string()]).unwrap();
        assert_eq!(pkgs.len(), 1);
        assert_eq!(pkgs[0].name().path(), "keep");
    }
}
