//! Version model and requirement matching.
//!
//! A Tern version is a numeric triple plus an optional stability tag and an
//! optional commit pin: `X[.X[.X]][-stability][/commit]`, or the dedicated
//! commit form `<hash>-commit`. With a stability tag, trailing numeric parts
//! may be left *floating* (unspecified) and are filled in later by
//! normalization against a repository's version table.
//!
//! The version `0.0.0` is the sentinel for "latest develop" and orders
//! greater than any real version.

use crate::error::VersionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z_]+))?$").expect("valid regex")
});

/// Stability tag of a version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    /// Pinned to a raw commit; the numeric triple is ignored.
    Commit,
    /// Floating onto the development head.
    Dev,
    /// Floating onto the newest matching release.
    Latest,
    /// Floating onto the newest matching stable release.
    Stable,
    /// Fully normalized; no tag.
    #[default]
    None,
}

impl Stability {
    /// Parse a stability tag.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "commit" => Some(Self::Commit),
            "dev" => Some(Self::Dev),
            "latest" => Some(Self::Latest),
            "stable" => Some(Self::Stable),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Dev => write!(f, "dev"),
            Self::Latest => write!(f, "latest"),
            Self::Stable => write!(f, "stable"),
            Self::None => write!(f, "none"),
        }
    }
}

/// A version with optional floating parts and commit pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    major: Option<u64>,
    minor: Option<u64>,
    revision: Option<u64>,
    stability: Stability,
    commit: Option<String>,
}

impl Version {
    /// A fully specified version with no stability tag.
    #[must_use]
    pub const fn new(major: u64, minor: u64, revision: u64) -> Self {
        Self {
            major: Some(major),
            minor: Some(minor),
            revision: Some(revision),
            stability: Stability::None,
            commit: None,
        }
    }

    /// A commit-pinned version. The numeric triple is ignored.
    #[must_use]
    pub fn commit_pin(commit: impl Into<String>) -> Self {
        Self {
            major: None,
            minor: None,
            revision: None,
            stability: Stability::Commit,
            commit: Some(commit.into()),
        }
    }

    /// Parse `X[.X[.X]][-stability][/commit]` or `<hash>-commit`.
    ///
    /// Without a stability tag, omitted numeric parts default to zero.
    /// With one, omitted parts stay floating for normalization to fill in.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionError::Malformed {
                input: input.to_string(),
            });
        }

        // The `<hash>-commit` form is not numeric at all.
        if let Some(hash) = input.strip_suffix("-commit") {
            if hash.is_empty() || hash.contains('/') {
                return Err(VersionError::Malformed {
                    input: input.to_string(),
                });
            }
            return Ok(Self::commit_pin(hash));
        }

        let (version_part, commit) = match input.split_once('/') {
            Some((v, c)) if !c.is_empty() => (v, Some(c.to_string())),
            Some(_) => {
                return Err(VersionError::Malformed {
                    input: input.to_string(),
                });
            }
            None => (input, None),
        };

        let caps = VERSION_REGEX
            .captures(version_part)
            .ok_or_else(|| VersionError::Malformed {
                input: input.to_string(),
            })?;

        let stability = match caps.get(4) {
            Some(tag) => {
                Stability::parse(tag.as_str()).ok_or_else(|| VersionError::UnknownStability {
                    tag: tag.as_str().to_string(),
                    input: input.to_string(),
                })?
            }
            None => Stability::None,
        };

        let num = |idx: usize| caps.get(idx).map(|m| m.as_str().parse::<u64>().unwrap_or(0));
        let (mut major, mut minor, mut revision) = (num(1), num(2), num(3));

        // Without a tag there is nothing left to normalize, so missing parts
        // mean zero rather than floating.
        if stability == Stability::None {
            major = major.or(Some(0));
            minor = minor.or(Some(0));
            revision = revision.or(Some(0));
        }

        Ok(Self {
            major,
            minor,
            revision,
            stability,
            commit,
        })
    }

    /// Major part, if specified.
    #[must_use]
    pub const fn major(&self) -> Option<u64> {
        self.major
    }

    /// Minor part, if specified.
    #[must_use]
    pub const fn minor(&self) -> Option<u64> {
        self.minor
    }

    /// Revision part, if specified.
    #[must_use]
    pub const fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// Stability tag.
    #[must_use]
    pub const fn stability(&self) -> Stability {
        self.stability
    }

    /// Commit hash, for commit pins and `/commit`-annotated versions.
    #[must_use]
    pub fn commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    /// Attach a commit hash to a numeric version.
    #[must_use]
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    /// A normalized version has no stability tag.
    #[must_use]
    pub const fn is_normalized(&self) -> bool {
        matches!(self.stability, Stability::None)
    }

    /// Is this a commit pin?
    #[must_use]
    pub const fn is_commit_pin(&self) -> bool {
        matches!(self.stability, Stability::Commit)
    }

    /// The `0.0.0` sentinel stands for "latest develop".
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.stability == Stability::None
            && self.major == Some(0)
            && self.minor == Some(0)
            && self.revision == Some(0)
    }

    /// Numeric triple with floating parts read as zero.
    #[must_use]
    pub fn triple(&self) -> (u64, u64, u64) {
        (
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.revision.unwrap_or(0),
        )
    }

    /// Compare numeric triples only, with the sentinel ordering greater
    /// than any real version.
    #[must_use]
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        match (self.is_sentinel(), other.is_sentinel()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.triple().cmp(&other.triple()),
        }
    }

    /// Does this version's numeric triple agree with every *specified* part
    /// of `pattern`? Used by version-table searches during normalization.
    #[must_use]
    pub fn matches_specified(&self, pattern: &Self) -> bool {
        let agrees = |mine: Option<u64>, pat: Option<u64>| match pat {
            Some(p) => mine.unwrap_or(0) == p,
            None => true,
        };
        agrees(self.major, pattern.major)
            && agrees(self.minor, pattern.minor)
            && agrees(self.revision, pattern.revision)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stability == Stability::Commit {
            return write!(f, "{}-commit", self.commit.as_deref().unwrap_or(""));
        }
        match (self.major, self.minor, self.revision) {
            (Some(ma), Some(mi), Some(re)) => write!(f, "{ma}.{mi}.{re}")?,
            (Some(ma), Some(mi), None) => write!(f, "{ma}.{mi}")?,
            (Some(ma), None, _) => write!(f, "{ma}")?,
            (None, _, _) => write!(f, "0")?,
        }
        if self.stability != Stability::None {
            write!(f, "-{}", self.stability)?;
        }
        if let Some(commit) = &self.commit {
            write!(f, "/{commit}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // The raw option triple keeps the order consistent with equality
        // for floating versions whose unspecified parts read as zero.
        self.cmp_numeric(other)
            .then_with(|| {
                (self.major, self.minor, self.revision).cmp(&(
                    other.major,
                    other.minor,
                    other.revision,
                ))
            })
            .then_with(|| self.stability.cmp(&other.stability))
            .then_with(|| self.commit.cmp(&other.commit))
    }
}

/// Comparison operator of a version requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReqOp {
    /// Strictly older.
    Lt,
    /// Older or equal.
    Le,
    /// Exactly equal.
    Eq,
    /// Newer or equal.
    Ge,
    /// Strictly newer.
    Gt,
    /// Same minor line: `~1.2.3` admits `>=1.2.3, <1.3.0`.
    Tilde,
    /// Same major line: `^1.2.3` admits `>=1.2.3, <2.0.0`.
    Caret,
}

impl fmt::Display for ReqOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Eq => write!(f, "=="),
            Self::Ge => write!(f, ">="),
            Self::Gt => write!(f, ">"),
            Self::Tilde => write!(f, "~"),
            Self::Caret => write!(f, "^"),
        }
    }
}

/// A single version requirement: an operator applied to a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionReq {
    op: ReqOp,
    version: Version,
}

impl VersionReq {
    /// Build a requirement from parts.
    #[must_use]
    pub const fn new(op: ReqOp, version: Version) -> Self {
        Self { op, version }
    }

    /// Parse a requirement string such as `>=1.0.0` or `0aae710-commit`.
    ///
    /// A bare version means exact equality. Combining a relational operator
    /// with a commit pin is accepted but meaningless; it logs a warning and
    /// matches the exact commit only.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        let (op, rest) = if let Some(rest) = input.strip_prefix("==") {
            (ReqOp::Eq, rest)
        } else if let Some(rest) = input.strip_prefix("<=") {
            (ReqOp::Le, rest)
        } else if let Some(rest) = input.strip_prefix(">=") {
            (ReqOp::Ge, rest)
        } else if let Some(rest) = input.strip_prefix('<') {
            (ReqOp::Lt, rest)
        } else if let Some(rest) = input.strip_prefix('>') {
            (ReqOp::Gt, rest)
        } else if let Some(rest) = input.strip_prefix('~') {
            (ReqOp::Tilde, rest)
        } else if let Some(rest) = input.strip_prefix('^') {
            (ReqOp::Caret, rest)
        } else {
            (ReqOp::Eq, input)
        };

        let version = Version::parse(rest.trim()).map_err(|_| VersionError::MalformedReq {
            input: input.to_string(),
        })?;

        if version.is_commit_pin() && op != ReqOp::Eq {
            tracing::warn!(
                requirement = input,
                "relational operator on a commit pin matches the exact commit only"
            );
        }

        Ok(Self { op, version })
    }

    /// Parse a comma-separated conjunction of requirements.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, VersionError> {
        input
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Operator.
    #[must_use]
    pub const fn op(&self) -> ReqOp {
        self.op
    }

    /// Version operand.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Does `ver` satisfy this requirement?
    ///
    /// Stability tags must match exactly. A commit requirement is satisfied
    /// only by its exact commit hash.
    #[must_use]
    pub fn matches(&self, ver: &Version) -> bool {
        if self.version.is_commit_pin() {
            return ver.commit() == self.version.commit();
        }
        if ver.stability() != self.version.stability() {
            return false;
        }

        let ord = ver.cmp_numeric(&self.version);
        match self.op {
            ReqOp::Lt => ord == Ordering::Less,
            ReqOp::Le => ord != Ordering::Greater,
            ReqOp::Eq => ord == Ordering::Equal,
            ReqOp::Ge => ord != Ordering::Less,
            ReqOp::Gt => ord == Ordering::Greater,
            ReqOp::Tilde => ord != Ordering::Less && ver.cmp_numeric(&self.tilde_upper()) == Ordering::Less,
            ReqOp::Caret => ord != Ordering::Less && ver.cmp_numeric(&self.caret_upper()) == Ordering::Less,
        }
    }

    /// Exclusive upper bound for `~`: bump the last specified part above the
    /// revision level.
    fn tilde_upper(&self) -> Version {
        let (major, minor, _) = self.version.triple();
        match self.version.minor() {
            Some(mi) => Version::new(major, mi + 1, 0),
            None => Version::new(major + 1, 0, 0),
        }
    }

    /// Exclusive upper bound for `^`: next major, or next minor/revision for
    /// zero-prefixed versions.
    fn caret_upper(&self) -> Version {
        let (major, minor, revision) = self.version.triple();
        if major > 0 {
            Version::new(major + 1, 0, 0)
        } else if minor > 0 {
            Version::new(0, minor + 1, 0)
        } else {
            Version::new(0, 0, revision + 1)
        }
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            ReqOp::Eq => write!(f, "{}", self.version),
            op => write!(f, "{op}{}", self.version),
        }
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn parse_full_triple() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.triple(), (1, 2, 3));
        assert_eq!(v.stability(), Stability::None);
        assert!(v.is_normalized());
    }

    #[test]
    fn parse_untagged_defaults_to_zero() {
        assert_eq!(Version::parse("2").unwrap(), Version::new(2, 0, 0));
        assert_eq!(Version::parse("2.1").unwrap(), Version::new(2, 1, 0));
    }

    #[test]
    fn parse_floating_keeps_parts_unspecified() {
        let v = Version::parse("1-dev").unwrap();
        assert_eq!(v.major(), Some(1));
        assert_eq!(v.minor(), None);
        assert_eq!(v.revision(), None);
        assert_eq!(v.stability(), Stability::Dev);
    }

    #[test]
    fn parse_commit_form() {
        let v = Version::parse("0aae710-commit").unwrap();
        assert!(v.is_commit_pin());
        assert_eq!(v.commit(), Some("0aae710"));
        assert_eq!(v.to_string(), "0aae710-commit");
    }

    #[test]
    fn parse_commit_annotation() {
        let v = Version::parse("1.2.3/0aae710").unwrap();
        assert_eq!(v.triple(), (1, 2, 3));
        assert_eq!(v.commit(), Some("0aae710"));
        assert_eq!(v.stability(), Stability::None);
    }

    #[test_case("" ; "empty")]
    #[test_case("abc" ; "letters")]
    #[test_case("1.2.3.4" ; "four parts")]
    #[test_case("1.2.3-flaky" ; "unknown tag")]
    #[test_case("1.2.3/" ; "empty commit")]
    #[test_case("-commit" ; "empty hash")]
    fn parse_rejects(input: &str) {
        assert!(Version::parse(input).is_err());
    }

    #[test]
    fn sentinel_orders_greatest() {
        let sentinel = Version::parse("0.0.0").unwrap();
        assert!(sentinel.is_sentinel());
        assert_eq!(
            sentinel.cmp_numeric(&Version::new(99, 0, 0)),
            Ordering::Greater
        );
        assert_eq!(
            Version::new(1, 0, 0).cmp_numeric(&sentinel),
            Ordering::Less
        );
        assert_eq!(sentinel.cmp_numeric(&sentinel.clone()), Ordering::Equal);
    }

    #[test]
    fn ordering_on_triples() {
        let mut versions = vec![
            Version::new(1, 10, 0),
            Version::new(1, 2, 0),
            Version::new(0, 9, 9),
        ];
        versions.sort();
        assert_eq!(versions[0], Version::new(0, 9, 9));
        assert_eq!(versions[2], Version::new(1, 10, 0));
    }

    #[test]
    fn matches_specified_against_floating_pattern() {
        let pattern = Version::parse("1-latest").unwrap();
        assert!(Version::new(1, 4, 2).matches_specified(&pattern));
        assert!(!Version::new(2, 0, 0).matches_specified(&pattern));
        // A fully floating pattern matches anything.
        let any = Version::parse("0-latest").unwrap();
        assert!(Version::new(0, 5, 1).matches_specified(&any));
    }

    #[test_case(">=1.0.0", "1.0.0", true ; "ge exact")]
    #[test_case(">=1.0.0", "2.5.0", true ; "ge above")]
    #[test_case(">=1.0.0", "0.9.9", false ; "ge below")]
    #[test_case("<2.0.0", "1.9.9", true ; "lt below")]
    #[test_case("<2.0.0", "2.0.0", false ; "lt exact")]
    #[test_case("1.2.3", "1.2.3", true ; "bare is exact")]
    #[test_case("1.2.3", "1.2.4", false ; "bare mismatch")]
    #[test_case("~1.2.0", "1.2.9", true ; "tilde patch")]
    #[test_case("~1.2.0", "1.3.0", false ; "tilde next minor")]
    #[test_case("^1.2.0", "1.9.0", true ; "caret minor")]
    #[test_case("^1.2.0", "2.0.0", false ; "caret next major")]
    #[test_case("^0.2.0", "0.2.5", true ; "caret zero major patch")]
    #[test_case("^0.2.0", "0.3.0", false ; "caret zero major next minor")]
    fn requirement_matching(req: &str, ver: &str, expected: bool) {
        let req = VersionReq::parse(req).unwrap();
        let ver = Version::parse(ver).unwrap();
        assert_eq!(req.matches(&ver), expected, "{req} vs {ver}");
    }

    #[test]
    fn requirement_stability_must_match_exactly() {
        let req = VersionReq::parse(">=1.0.0").unwrap();
        assert!(!req.matches(&Version::parse("2-dev").unwrap()));
        let dev_req = VersionReq::parse(">=1-dev").unwrap();
        assert!(dev_req.matches(&Version::parse("2-dev").unwrap()));
    }

    #[test]
    fn sentinel_satisfies_upward_requirements() {
        let req = VersionReq::parse(">=1.0.0").unwrap();
        assert!(req.matches(&Version::parse("0.0.0").unwrap()));
    }

    #[test]
    fn commit_requirement_matches_exact_hash_only() {
        let req = VersionReq::parse("0aae710-commit").unwrap();
        assert!(req.matches(&Version::commit_pin("0aae710")));
        assert!(!req.matches(&Version::commit_pin("deadbeef")));
        assert!(!req.matches(&Version::new(1, 0, 0)));
        // A numeric version annotated with the commit also matches.
        assert!(req.matches(&Version::new(1, 0, 0).with_commit("0aae710")));
    }

    #[test]
    fn parse_list_splits_conjunctions() {
        let reqs = VersionReq::parse_list(">=1.0.0, <2.0.0").unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].op(), ReqOp::Ge);
        assert_eq!(reqs[1].op(), ReqOp::Lt);
    }

    proptest! {
        /// `parse(format(v)) == v` for every version that parses.
        #[test]
        fn prop_roundtrip(major in 0u64..1000, minor in 0u64..1000, revision in 0u64..1000) {
            let v = Version::new(major, minor, revision);
            let reparsed = Version::parse(&v.to_string()).unwrap();
            prop_assert_eq!(v, reparsed);
        }

        /// Floating versions also round-trip through their display form.
        #[test]
        fn prop_roundtrip_floating(major in 0u64..1000, tag in prop::sample::select(vec!["dev", "latest", "stable"])) {
            let text = format!("{major}-{tag}");
            let v = Version::parse(&text).unwrap();
            let reparsed = Version::parse(&v.to_string()).unwrap();
            prop_assert_eq!(v, reparsed);
        }

        /// Numeric comparison is antisymmetric away from the sentinel.
        #[test]
        fn prop_cmp_antisymmetric(a in 1u64..100, b in 1u64..100) {
            let va = Version::new(a, 0, 0);
            let vb = Version::new(b, 0, 0);
            prop_assert_eq!(va.cmp_numeric(&vb), vb.cmp_numeric(&va).reverse());
        }
    }
}
