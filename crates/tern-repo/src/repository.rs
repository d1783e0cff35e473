//! Repository metadata cache.
//!
//! One [`Repository`] per remote: the version-to-commit table, the
//! per-commit dependency lists, the tool-compatibility table, and the
//! downloader handle. Constructed at project load from `repository.yml`,
//! mutated only by a metadata refresh, read-only everywhere else.

use crate::compat::CompatTable;
use crate::downloader::Downloader;
use crate::error::RepoError;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tern_core::{Stability, Value, Version, VersionError, VersionReq};

/// A dependency another repository declares on this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDep {
    /// Name of the required repository.
    pub name: String,
    /// Requirement set the selected version must satisfy.
    pub reqs: Vec<VersionReq>,
    /// Transport fields (`type`, `user`, ...) passed through untouched.
    pub fields: BTreeMap<String, String>,
}

/// Metadata for one repository.
#[derive(Debug)]
pub struct Repository {
    name: String,
    vers: BTreeMap<Version, String>,
    deps: BTreeMap<String, Vec<RepoDep>>,
    compat: CompatTable,
    downloader: Option<Box<dyn Downloader>>,
}

impl Repository {
    /// An empty repository, for incremental construction in tests.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vers: BTreeMap::new(),
            deps: BTreeMap::new(),
            compat: CompatTable::new(),
            downloader: None,
        }
    }

    /// Parse a `repository.yml`.
    ///
    /// Expected keys: `repo.name`, `repo.versions` (version string to
    /// commit), `repo.deps` (dependency repo name to mapping of this-repo
    /// commit to requirement fields), optional `repo.newt_compatibility`.
    pub fn from_yaml_str(file: &Path, text: &str) -> Result<Self, RepoError> {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| RepoError::MalformedDescriptor {
                file: file.to_path_buf(),
                reason: e.to_string(),
            })?;
        let doc = Value::from_yaml(parsed).map_err(|e| RepoError::MalformedDescriptor {
            file: file.to_path_buf(),
            reason: e.to_string(),
        })?;

        let malformed = |reason: String| RepoError::MalformedDescriptor {
            file: file.to_path_buf(),
            reason,
        };

        let name = doc
            .get("repo.name")
            .and_then(|v| v.as_str().ok())
            .ok_or_else(|| malformed("missing `repo.name`".to_string()))?;

        let mut repo = Self::new(name);

        if let Some(versions) = doc.get("repo.versions") {
            let entries = versions
                .as_mapping()
                .map_err(|e| malformed(format!("`repo.versions`: {e}")))?;
            for (ver_text, commit) in entries {
                let version = Version::parse(ver_text)?;
                let commit = commit
                    .as_str()
                    .map_err(|e| malformed(format!("`repo.versions` entry `{ver_text}`: {e}")))?;
                repo.vers.insert(version, commit);
            }
        }

        if let Some(deps) = doc.get("repo.deps") {
            let by_dep = deps
                .as_mapping()
                .map_err(|e| malformed(format!("`repo.deps`: {e}")))?;
            for (dep_name, by_commit) in by_dep {
                let by_commit = by_commit
                    .as_mapping()
                    .map_err(|e| malformed(format!("`repo.deps.{dep_name}`: {e}")))?;
                for (commit, spec) in by_commit {
                    let spec_map = spec
                        .as_mapping()
                        .map_err(|e| malformed(format!("`repo.deps.{dep_name}.{commit}`: {e}")))?;

                    let mut reqs = Vec::new();
                    let mut fields = BTreeMap::new();
                    for (k, v) in spec_map {
                        if k == "vers" {
                            let text = v.as_str().map_err(|e| {
                                malformed(format!("`repo.deps.{dep_name}.{commit}.vers`: {e}"))
                            })?;
                            reqs = VersionReq::parse_list(&text)?;
                        } else if let Ok(text) = v.as_str() {
                            fields.insert(k.clone(), text);
                        }
                    }

                    repo.deps
                        .entry(commit.clone())
                        .or_default()
                        .push(RepoDep {
                            name: dep_name.clone(),
                            reqs,
                            fields,
                        });
                }
            }
            // Deterministic dependency order per commit.
            for dep_list in repo.deps.values_mut() {
                dep_list.sort_by(|a, b| a.name.cmp(&b.name));
            }
        }

        if let Some(compat) = doc.get("repo.newt_compatibility") {
            repo.compat = CompatTable::from_value(compat);
        }

        tracing::debug!(
            repo = %repo.name,
            versions = repo.vers.len(),
            "loaded repository metadata"
        );
        Ok(repo)
    }

    /// Load `repository.yml` from a repository's working-copy directory.
    pub fn load(dir: &Path) -> Result<Self, RepoError> {
        let file = dir.join("repository.yml");
        let text = std::fs::read_to_string(&file).map_err(|e| RepoError::io(&file, &e))?;
        Self::from_yaml_str(&file, &text)
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version table, ordered by version.
    #[must_use]
    pub const fn versions(&self) -> &BTreeMap<Version, String> {
        &self.vers
    }

    /// Add a version-table entry.
    pub fn add_version(&mut self, version: Version, commit: impl Into<String>) {
        self.vers.insert(version, commit.into());
    }

    /// Add a dependency declared as of `commit`.
    pub fn add_dep(&mut self, commit: impl Into<String>, dep: RepoDep) {
        let list = self.deps.entry(commit.into()).or_default();
        list.push(dep);
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Commit backing `version`, from the version table.
    #[must_use]
    pub fn commit_for<'a>(&'a self, version: &'a Version) -> Option<&'a str> {
        if version.is_commit_pin() {
            return version.commit();
        }
        self.vers.get(version).map(String::as_str)
    }

    /// Dependencies declared as of `commit`.
    #[must_use]
    pub fn deps_for_commit(&self, commit: &str) -> &[RepoDep] {
        self.deps.get(commit).map_or(&[], Vec::as_slice)
    }

    /// Dependencies of a table version. Commit pins contribute none: a pin
    /// overrides inter-repository dependency propagation.
    #[must_use]
    pub fn deps_for_version(&self, version: &Version) -> &[RepoDep] {
        if version.is_commit_pin() {
            return &[];
        }
        match self.vers.get(version) {
            Some(commit) => self.deps_for_commit(commit),
            None => &[],
        }
    }

    /// Tool-compatibility table.
    #[must_use]
    pub const fn compat(&self) -> &CompatTable {
        &self.compat
    }

    /// Attach the downloader handle.
    pub fn set_downloader(&mut self, downloader: Box<dyn Downloader>) {
        self.downloader = Some(downloader);
    }

    /// The downloader handle, if attached.
    #[must_use]
    pub fn downloader(&self) -> Option<&dyn Downloader> {
        self.downloader.as_deref()
    }

    /// The newest table version satisfying every requirement in `reqs`.
    #[must_use]
    pub fn best_match(&self, reqs: &[VersionReq]) -> Option<Version> {
        self.vers
            .keys()
            .filter(|v| reqs.iter().all(|req| req.matches(v)))
            .max_by(|a, b| a.cmp_numeric(b))
            .cloned()
    }

    /// Normalize a version against the version table.
    ///
    /// Floating versions (`1-dev`, `1-stable`, `1-latest`) resolve to the
    /// highest table entry whose specified numeric parts agree; `-stable`
    /// additionally refuses the `0.0.0` develop sentinel. A table entry may
    /// itself carry a tag (an alias), so normalization repeats until the
    /// stability is gone; revisiting a version is a cycle and fatal. Commit
    /// pins normalize through reverse table lookup when possible and are
    /// otherwise returned unchanged.
    pub fn normalize(&self, version: &Version) -> Result<Version, VersionError> {
        let mut current = version.clone();
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            match current.stability() {
                Stability::None => return Ok(current),
                Stability::Commit => {
                    let commit = current.commit().unwrap_or_default().to_string();
                    let found = self
                        .vers
                        .iter()
                        .find(|(_, c)| c.as_str() == commit)
                        .map(|(v, _)| v.clone());
                    return match found {
                        Some(v) => Ok(v.with_commit(commit)),
                        None => Ok(current),
                    };
                }
                tag => {
                    if !seen.insert(current.to_string()) {
                        return Err(VersionError::NormalizationCycle {
                            start: version.to_string(),
                            repo: self.name.clone(),
                        });
                    }
                    let candidate = self
                        .vers
                        .keys()
                        .filter(|entry| entry.matches_specified(&current))
                        .filter(|entry| match tag {
                            Stability::Stable => !entry.is_sentinel(),
                            _ => true,
                        })
                        .max()
                        .cloned();
                    match candidate {
                        Some(next) => current = next,
                        None => {
                            return Err(VersionError::NoMatch {
                                pattern: current.to_string(),
                                repo: self.name.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    /// Resolve a commit pin to a concrete version using the working copy's
    /// `version.yml` at that commit, falling back to the version table.
    /// Chains of pins are followed; revisiting a commit is a cycle.
    pub fn version_at_commit(&self, repo_dir: &Path, commit: &str) -> Result<Version, RepoError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = commit.to_string();

        loop {
            if !seen.insert(current.clone()) {
                return Err(RepoError::CommitPinCycle {
                    repo: self.name.clone(),
                    commit: commit.to_string(),
                });
            }

            if let Some(downloader) = self.downloader() {
                if let Ok(text) = downloader.show_file(repo_dir, &current, "version.yml") {
                    let version =
                        crate::versionfile::parse_version_file(&repo_dir.join("version.yml"), &text)?;
                    return Ok(version.with_commit(current));
                }
            }

            // No version.yml at that commit; fall back to the table.
            let found = self
                .vers
                .iter()
                .find(|(_, c)| c.as_str() == current)
                .map(|(v, _)| v.clone());
            match found {
                Some(v) if v.is_commit_pin() => {
                    current = v.commit().unwrap_or_default().to_string();
                }
                Some(v) => return Ok(v.with_commit(current)),
                None => return Ok(Version::commit_pin(current)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    const CORE_YML: &str = "\
repo.name: core
repo.versions:
    \"0.0.0\": master6789
    \"1.3.0\": commit1300
    \"1.4.1\": commit1410
    \"2.0.0\": commit2000
repo.deps:
    nimble:
        \"commit1410\":
            vers: \">=1.0.0, <2.0.0\"
            type: github
            user: acme
        \"commit2000\":
            vers: \">=2.0.0\"
            type: github
";

    fn core() -> Repository {
        Repository::from_yaml_str(Path::new("repository.yml"), CORE_YML).unwrap()
    }

    #[test]
    fn parses_version_table() {
        let repo = core();
        assert_eq!(repo.name(), "core");
        assert_eq!(repo.versions().len(), 4);
        assert_eq!(repo.commit_for(&Version::new(1, 3, 0)), Some("commit1300"));
    }

    #[test]
    fn parses_commit_deps() {
        let repo = core();
        let deps = repo.deps_for_version(&Version::new(1, 4, 1));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "nimble");
        assert_eq!(deps[0].reqs.len(), 2);
        assert_eq!(deps[0].fields.get("user").map(String::as_str), Some("acme"));
    }

    #[test]
    fn commit_pin_has_no_deps() {
        let repo = core();
        let pin = Version::commit_pin("commit1410");
        assert!(repo.deps_for_version(&pin).is_empty());
    }

    #[test]
    fn best_match_picks_highest() {
        let repo = core();
        let reqs = VersionReq::parse_list(">=1.0.0, <2.0.0").unwrap();
        assert_eq!(repo.best_match(&reqs), Some(Version::new(1, 4, 1)));
    }

    #[test]
    fn normalize_latest_prefers_sentinel() {
        let repo = core();
        // 0-latest matches 0.0.0 (the develop sentinel), which orders
        // greater than any real version.
        let v = repo.normalize(&Version::parse("0-latest").unwrap()).unwrap();
        assert!(v.is_sentinel());
    }

    #[test]
    fn normalize_stable_skips_sentinel() {
        let mut repo = Repository::new("r");
        repo.add_version(Version::new(0, 0, 0), "dev");
        repo.add_version(Version::new(0, 9, 0), "c090");
        let v = repo.normalize(&Version::parse("0-stable").unwrap()).unwrap();
        assert_eq!(v, Version::new(0, 9, 0));
    }

    #[test]
    fn normalize_floating_major() {
        let repo = core();
        let v = repo.normalize(&Version::parse("1-latest").unwrap()).unwrap();
        assert_eq!(v, Version::new(1, 4, 1));
    }

    #[test]
    fn normalize_is_idempotent() {
        let repo = core();
        let once = repo.normalize(&Version::parse("1-latest").unwrap()).unwrap();
        let twice = repo.normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_no_match_is_an_error() {
        let repo = core();
        assert_matches!(
            repo.normalize(&Version::parse("9-latest").unwrap()),
            Err(VersionError::NoMatch { .. })
        );
    }

    #[test]
    fn normalize_alias_cycle_is_fatal() {
        let mut repo = Repository::new("r");
        // A table whose only entry for the pattern is itself still tagged.
        repo.add_version(Version::parse("1-dev").unwrap(), "c1");
        assert_matches!(
            repo.normalize(&Version::parse("1-dev").unwrap()),
            Err(VersionError::NormalizationCycle { .. })
        );
    }

    #[test]
    fn normalize_commit_reverse_lookup() {
        let repo = core();
        let v = repo.normalize(&Version::commit_pin("commit1300")).unwrap();
        assert_eq!(v.triple(), (1, 3, 0));
        assert_eq!(v.commit(), Some("commit1300"));
    }

    #[test]
    fn normalize_unknown_commit_stays_pinned() {
        let repo = core();
        let pin = Version::commit_pin("deadbeef");
        assert_eq!(repo.normalize(&pin).unwrap(), pin);
    }

    #[test]
    fn missing_name_is_malformed() {
        let err = Repository::from_yaml_str(Path::new("r.yml"), "repo.versions: {}\n");
        assert_matches!(err, Err(RepoError::MalformedDescriptor { .. }));
    }
}
