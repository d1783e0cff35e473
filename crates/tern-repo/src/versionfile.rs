//! `version.yml` handling.
//!
//! A repository working copy carries a `version.yml` naming the normalized
//! version that commit corresponds to. Stability tags are not allowed
//! there; a tagged version makes the file malformed.

use crate::error::RepoError;
use std::path::Path;
use tern_core::{Value, Version, VersionError};

/// Parse a `version.yml` document.
pub fn parse_version_file(file: &Path, text: &str) -> Result<Version, RepoError> {
    let parsed: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| RepoError::MalformedDescriptor {
            file: file.to_path_buf(),
            reason: e.to_string(),
        })?;
    let doc = Value::from_yaml(parsed).map_err(|e| RepoError::MalformedDescriptor {
        file: file.to_path_buf(),
        reason: e.to_string(),
    })?;

    let text = doc
        .get("repo.version")
        .and_then(|v| v.as_str().ok())
        .ok_or_else(|| RepoError::MalformedDescriptor {
            file: file.to_path_buf(),
            reason: "missing `repo.version`".to_string(),
        })?;

    let version = Version::parse(&text)?;
    if !version.is_normalized() {
        return Err(RepoError::Version(VersionError::NotNormalized {
            path: file.to_path_buf(),
            version: text,
        }));
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_normalized_version() {
        let v = parse_version_file(Path::new("version.yml"), "repo.version: 1.4.1\n").unwrap();
        assert_eq!(v, Version::new(1, 4, 1));
    }

    #[test]
    fn stability_tag_is_malformed() {
        assert_matches!(
            parse_version_file(Path::new("version.yml"), "repo.version: 1.4.1-dev\n"),
            Err(RepoError::Version(VersionError::NotNormalized { .. }))
        );
    }

    #[test]
    fn missing_key_is_malformed() {
        assert_matches!(
            parse_version_file(Path::new("version.yml"), "something: else\n"),
            Err(RepoError::MalformedDescriptor { .. })
        );
    }
}
