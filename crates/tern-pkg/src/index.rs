//! Project-wide package index.

use crate::package::Package;
use std::sync::Arc;
use tern_core::PkgRef;

/// All packages known to a project, keyed by canonical reference.
///
/// Built once at project load and read-only afterwards. Iteration order is
/// lexicographic on the canonical reference, which is what makes resolver
/// output stable.
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    pkgs: std::collections::BTreeMap<PkgRef, Arc<Package>>,
}

impl PackageIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a package. A duplicate reference replaces the earlier entry
    /// and logs a warning; repositories should not overlap.
    pub fn insert(&mut self, pkg: Package) {
        let name = pkg.name().clone();
        if self.pkgs.insert(name.clone(), Arc::new(pkg)).is_some() {
            tracing::warn!(pkg = %name, "duplicate package registered; later load wins");
        }
    }

    /// Look up a package by canonical reference.
    #[must_use]
    pub fn get(&self, name: &PkgRef) -> Option<&Arc<Package>> {
        self.pkgs.get(name)
    }

    /// Does the index contain `name`?
    #[must_use]
    pub fn contains(&self, name: &PkgRef) -> bool {
        self.pkgs.contains_key(name)
    }

    /// All packages, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.pkgs.values()
    }

    /// Number of packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pkgs.len()
    }

    /// Is the index empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pkgs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_cct::Cct;

    fn pkg(repo: &str, path: &str) -> Package {
        Package::from_cct(PkgRef::new(repo, path), Cct::new()).unwrap()
    }

    #[test]
    fn lookup_and_iteration_order() {
        let mut index = PackageIndex::new();
        index.insert(pkg("z", "a"));
        index.insert(pkg("a", "z"));
        index.insert(pkg("a", "b"));

        assert_eq!(index.len(), 3);
        assert!(index.contains(&PkgRef::new("a", "z")));

        let names: Vec<String> = index.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["@a/b", "@a/z", "@z/a"]);
    }

    #[test]
    fn duplicate_replaces() {
        let mut index = PackageIndex::new();
        index.insert(pkg("core", "x"));
        index.insert(pkg("core", "x"));
        assert_eq!(index.len(), 1);
    }
}
