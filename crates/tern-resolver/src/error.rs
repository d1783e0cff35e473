//! Resolution errors.

use tern_core::PkgRef;
use tern_pkg::PkgError;
use tern_syscfg::SyscfgError;
use thiserror::Error;

/// One independent problem found during resolution.
///
/// Problems accumulate into a [`ResolveReport`] so users see everything a
/// pass discovered, not one error at a time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Problem {
    /// A dependency reference under a true guard resolves to no known
    /// package.
    #[error("{pkg} depends on missing package {dep}")]
    MissingDependency {
        /// The depending package.
        pkg: PkgRef,
        /// The unresolvable reference.
        dep: PkgRef,
    },

    /// A required API has no supplier in the resolved set.
    #[error("api `{api}` required by {} has no supplier",
            requirers.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    ApiUnsatisfied {
        /// The API name.
        api: String,
        /// Packages that require it.
        requirers: Vec<PkgRef>,
    },

    /// A required API has several same-priority suppliers.
    #[error("api `{api}` supplied by multiple packages of equal priority: {}",
            suppliers.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    ApiConflict {
        /// The API name.
        api: String,
        /// The tied suppliers.
        suppliers: Vec<PkgRef>,
    },

    /// A configuration error from syscfg flattening.
    #[error(transparent)]
    Config(SyscfgError),

    /// Two packages contribute a staged entry with the same name.
    #[error("stage entry `{name}` declared by both {first} and {second}")]
    StageNameConflict {
        /// The duplicated entry name.
        name: String,
        /// First contributor.
        first: PkgRef,
        /// Second contributor.
        second: PkgRef,
    },

    /// A before/after reference names an unknown entry.
    #[error("stage entry `{entry}` references unknown entry `{reference}`")]
    UnknownStageDependency {
        /// The referencing entry.
        entry: String,
        /// The missing name.
        reference: String,
    },

    /// The stage constraints form a cycle.
    #[error("circular stage dependency among: {}", cycle.join(", "))]
    CircularStageDependency {
        /// Entries in the cycle (or its strongly connected remainder).
        cycle: Vec<String>,
    },
}

/// Resolution failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Resolution finished but found problems; all of them are here.
    #[error("resolution failed with {} problem(s):\n{}", problems.len(),
            problems.iter().map(|p| format!("    {p}")).collect::<Vec<_>>().join("\n"))]
    Report {
        /// Every problem found in the final pass.
        problems: Vec<Problem>,
    },

    /// The fixed-point loop hit the iteration cap.
    #[error("resolution did not converge after {iterations} iterations")]
    NonConvergence {
        /// The cap that was hit.
        iterations: u32,
    },

    /// A seed package is not in the index.
    #[error("seed package {pkg} not found")]
    SeedNotFound {
        /// The missing seed.
        pkg: PkgRef,
    },

    /// Cancellation observed before an outer-loop iteration.
    #[error("resolution aborted")]
    Aborted,

    /// A descriptor was malformed; resolution cannot proceed.
    #[error(transparent)]
    Pkg(#[from] PkgError),
}
