//! Canonical package references.
//!
//! Dependency references in descriptor files come in two spellings:
//! `@repo/path/to/pkg` and bare `path/to/pkg` (relative to the referrer's
//! repository). They are canonicalized at the parse boundary; only the
//! canonical `{repo, path}` form crosses module boundaries.

use crate::error::PkgRefError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository id used for packages that live in the project itself.
pub const PROJECT_REPO: &str = "project";

/// A canonical package reference: `@repo/path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PkgRef {
    repo: String,
    path: String,
}

impl PkgRef {
    /// Build a reference from already-canonical parts.
    #[must_use]
    pub fn new(repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            path: path.into(),
        }
    }

    /// Parse a descriptor-file reference, resolving bare paths against
    /// `default_repo` (the repository of the referring package).
    pub fn parse(input: &str, default_repo: &str) -> Result<Self, PkgRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PkgRefError::Malformed {
                input: input.to_string(),
            });
        }

        if let Some(rest) = input.strip_prefix('@') {
            let (repo, path) = rest.split_once('/').ok_or_else(|| PkgRefError::Malformed {
                input: input.to_string(),
            })?;
            if repo.is_empty() {
                return Err(PkgRefError::EmptyRepo {
                    input: input.to_string(),
                });
            }
            if path.is_empty() {
                return Err(PkgRefError::Malformed {
                    input: input.to_string(),
                });
            }
            return Ok(Self::new(repo, normalize_path(path)));
        }

        Ok(Self::new(default_repo, normalize_path(input)))
    }

    /// Repository id.
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Path of the package within its repository.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Short name: the last path segment.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Does this reference live in the project's own tree?
    #[must_use]
    pub fn is_project_local(&self) -> bool {
        self.repo == PROJECT_REPO
    }
}

impl fmt::Display for PkgRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/{}", self.repo, self.path)
    }
}

/// Strip duplicate and trailing slashes.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_qualified() {
        let r = PkgRef::parse("@core/sys/log", "mine").unwrap();
        assert_eq!(r.repo(), "core");
        assert_eq!(r.path(), "sys/log");
        assert_eq!(r.to_string(), "@core/sys/log");
    }

    #[test]
    fn parse_bare_uses_default_repo() {
        let r = PkgRef::parse("hw/bsp/native", "core").unwrap();
        assert_eq!(r.repo(), "core");
        assert_eq!(r.path(), "hw/bsp/native");
    }

    #[test]
    fn parse_normalizes_slashes() {
        let r = PkgRef::parse("@core//sys//log/", "x").unwrap();
        assert_eq!(r.path(), "sys/log");
    }

    #[test]
    fn parse_rejects_bad_forms() {
        assert!(PkgRef::parse("", "x").is_err());
        assert!(PkgRef::parse("@/path", "x").is_err());
        assert!(PkgRef::parse("@core", "x").is_err());
    }

    #[test]
    fn ordering_is_lexicographic_on_repo_then_path() {
        let mut refs = vec![
            PkgRef::new("b", "a"),
            PkgRef::new("a", "z"),
            PkgRef::new("a", "a"),
        ];
        refs.sort();
        let shown: Vec<String> = refs.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["@a/a", "@a/z", "@b/a"]);
    }

    #[test]
    fn short_name() {
        assert_eq!(PkgRef::new("core", "sys/log/full").short_name(), "full");
        assert_eq!(PkgRef::new("core", "libc").short_name(), "libc");
    }
}
