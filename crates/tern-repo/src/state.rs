//! Installed-state file.
//!
//! `project.state` records one `name,version` pair per line (the version
//! may be a `<tag>-tag` token for checkouts that track a branch or tag).
//! It exists solely so commands can tell whether the working copies are in
//! the state the user expects; resolution never reads it for correctness.

use crate::error::RepoError;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// The recorded selection for each installed repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledState {
    entries: BTreeMap<String, String>,
}

impl InstalledState {
    /// An empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the state-file format.
    pub fn parse(file: &Path, text: &str) -> Result<Self, RepoError> {
        let mut entries = BTreeMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, version)) = line.split_once(',') else {
                return Err(RepoError::StateFileCorruption {
                    file: file.to_path_buf(),
                    line: idx + 1,
                    text: line.to_string(),
                });
            };
            let (name, version) = (name.trim(), version.trim());
            if name.is_empty() || version.is_empty() {
                return Err(RepoError::StateFileCorruption {
                    file: file.to_path_buf(),
                    line: idx + 1,
                    text: line.to_string(),
                });
            }
            entries.insert(name.to_string(), version.to_string());
        }
        Ok(Self { entries })
    }

    /// Load from disk; a missing file is an empty state.
    pub fn load(file: &Path) -> Result<Self, RepoError> {
        if !file.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(file).map_err(|e| RepoError::io(file, &e))?;
        Self::parse(file, &text)
    }

    /// Write to disk.
    pub fn save(&self, file: &Path) -> Result<(), RepoError> {
        let mut text = String::new();
        for (name, version) in &self.entries {
            let _ = writeln!(text, "{name},{version}");
        }
        std::fs::write(file, text).map_err(|e| RepoError::io(file, &e))
    }

    /// Recorded version token for `repo`.
    #[must_use]
    pub fn get(&self, repo: &str) -> Option<&str> {
        self.entries.get(repo).map(String::as_str)
    }

    /// Record a selection.
    pub fn set(&mut self, repo: impl Into<String>, version: impl Into<String>) {
        self.entries.insert(repo.into(), version.into());
    }

    /// Drop a repository's record.
    pub fn remove(&mut self, repo: &str) {
        self.entries.remove(repo);
    }

    /// All entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("project.state");

        let mut state = InstalledState::new();
        state.set("core", "1.4.1");
        state.set("nimble", "mytag-tag");
        state.save(&file).unwrap();

        let loaded = InstalledState::load(&file).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.get("core"), Some("1.4.1"));
    }

    #[test]
    fn missing_file_is_empty() {
        let state = InstalledState::load(Path::new("/nonexistent/project.state")).unwrap();
        assert_eq!(state, InstalledState::new());
    }

    #[test]
    fn corrupt_line_names_the_line() {
        let err = InstalledState::parse(
            Path::new("project.state"),
            "core,1.0.0\nnot a record\n",
        );
        assert_matches!(
            err,
            Err(RepoError::StateFileCorruption { line: 2, .. })
        );
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        let state = InstalledState::parse(
            Path::new("project.state"),
            "# header\n\ncore,1.0.0\n",
        )
        .unwrap();
        assert_eq!(state.get("core"), Some("1.0.0"));
    }
}
