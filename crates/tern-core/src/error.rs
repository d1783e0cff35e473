//! Error types for core conversions and parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from converting a [`crate::Value`] to a concrete type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    /// The value is not an integer and cannot be coerced to one.
    #[error("expected an integer, found {found}: `{text}`")]
    NotAnInt {
        /// Kind of the value actually present.
        found: &'static str,
        /// Rendered form of the offending value.
        text: String,
    },

    /// The value is not a boolean and cannot be coerced to one.
    #[error("expected a boolean, found {found}: `{text}`")]
    NotABool {
        /// Kind of the value actually present.
        found: &'static str,
        /// Rendered form of the offending value.
        text: String,
    },

    /// The value is not a scalar string.
    #[error("expected a string, found {found}")]
    NotAString {
        /// Kind of the value actually present.
        found: &'static str,
    },

    /// The value is not a sequence.
    #[error("expected a sequence, found {found}")]
    NotASequence {
        /// Kind of the value actually present.
        found: &'static str,
    },

    /// The value is not a mapping.
    #[error("expected a mapping, found {found}")]
    NotAMapping {
        /// Kind of the value actually present.
        found: &'static str,
    },

    /// A mapping key was not a scalar string.
    #[error("mapping key is not a string: `{text}`")]
    NonStringKey {
        /// Rendered form of the offending key.
        text: String,
    },

    /// The YAML document used a construct the value model does not admit.
    #[error("unsupported yaml construct: {reason}")]
    Unsupported {
        /// What was encountered.
        reason: String,
    },
}

/// Errors from parsing a version or a version requirement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionError {
    /// The string does not match `X[.X[.X]][-stability][/commit]`.
    #[error("malformed version string `{input}`")]
    Malformed {
        /// The rejected input.
        input: String,
    },

    /// A stability tag other than the known set was used.
    #[error("unknown stability tag `{tag}` in `{input}`")]
    UnknownStability {
        /// The rejected tag.
        tag: String,
        /// The full input.
        input: String,
    },

    /// The requirement operator was not recognized.
    #[error("malformed version requirement `{input}`")]
    MalformedReq {
        /// The rejected input.
        input: String,
    },

    /// A `version.yml` carried a stability tag; it must be normalized.
    #[error("version file {path} holds non-normalized version `{version}`")]
    NotNormalized {
        /// The offending file.
        path: PathBuf,
        /// The offending version.
        version: String,
    },

    /// Repeated normalization never reached a concrete version.
    #[error("version normalization cycle for `{start}` in repository `{repo}`")]
    NormalizationCycle {
        /// The version that started the loop.
        start: String,
        /// Repository whose version table was consulted.
        repo: String,
    },

    /// A floating version had no matching entry in the version table.
    #[error("no version matching `{pattern}` in repository `{repo}`")]
    NoMatch {
        /// The floating pattern.
        pattern: String,
        /// Repository whose version table was consulted.
        repo: String,
    },
}

/// Errors from parsing a package reference.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PkgRefError {
    /// The reference was empty or syntactically invalid.
    #[error("malformed package reference `{input}`")]
    Malformed {
        /// The rejected input.
        input: String,
    },

    /// A `@repo/...` reference named a repository with an empty name.
    #[error("package reference `{input}` has an empty repository name")]
    EmptyRepo {
        /// The rejected input.
        input: String,
    },
}
