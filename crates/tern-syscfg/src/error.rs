//! Syscfg configuration errors.
//!
//! These accumulate during flattening instead of aborting it; the resolver
//! inspects the full list once the package set has converged, so users see
//! every independent problem in one pass.

use tern_core::PkgRef;
use thiserror::Error;

/// A configuration error found while flattening.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyscfgError {
    /// Two packages both define the same setting.
    #[error("setting `{setting}` defined by both {first} and {second}")]
    AmbiguousDefinition {
        /// Setting name.
        setting: String,
        /// First defining package seen.
        first: PkgRef,
        /// Second defining package seen.
        second: PkgRef,
    },

    /// A package overrides a setting no package defines.
    #[error("{pkg} overrides undefined setting `{setting}`")]
    OverrideOfUndefined {
        /// Setting name.
        setting: String,
        /// Overriding package.
        pkg: PkgRef,
    },

    /// An override value is outside the setting's restricted set.
    #[error("{pkg} sets `{setting}` to `{value}`, not one of [{}]", allowed.join(", "))]
    RestrictionViolated {
        /// Setting name.
        setting: String,
        /// Overriding package.
        pkg: PkgRef,
        /// The rejected value.
        value: String,
        /// Permitted values.
        allowed: Vec<String>,
    },

    /// An int/bool setting's final value failed to evaluate.
    #[error("setting `{setting}` value `{value}` does not evaluate: {reason}")]
    NonEvaluable {
        /// Setting name.
        setting: String,
        /// The raw value text.
        value: String,
        /// Why evaluation failed.
        reason: String,
    },

    /// An override value was a sequence or mapping.
    #[error("{pkg} sets `{setting}` to a non-scalar value")]
    NonScalarValue {
        /// Setting name.
        setting: String,
        /// Overriding package.
        pkg: PkgRef,
    },
}
