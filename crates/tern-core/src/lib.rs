//! Core types and utilities shared by every Tern crate.
//!
//! This crate holds the vocabulary of the build system:
//!
//! - [`Value`]: the tagged value type every descriptor file is converted
//!   into at the YAML boundary. No raw YAML value crosses a crate boundary.
//! - [`PkgRef`]: canonical `@repo/path` package references.
//! - [`Version`] and [`VersionReq`]: the version model, with stability tags
//!   and commit pins.
//! - [`event`]: the structured event stream rendered by higher layers.
//! - [`AbortFlag`]: cooperative cancellation observed between work units.

pub mod abort;
pub mod error;
pub mod event;
pub mod pkgref;
pub mod value;
pub mod version;

pub use abort::AbortFlag;
pub use error::{PkgRefError, ValueError, VersionError};
pub use pkgref::PkgRef;
pub use value::Value;
pub use version::{ReqOp, Stability, Version, VersionReq};
