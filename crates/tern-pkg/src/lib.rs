//! Package model for Tern.
//!
//! Packages are typed units (target, app, bsp, compiler, unittest, lib,
//! generated) each owning the merged conditional configuration tree of
//! their descriptor files. The tree is immutable after load; dependency
//! lists, API declarations, syscfg contributions, and staged-function
//! entries are projections recomputed under whatever environment the
//! resolver currently holds.

pub mod discover;
pub mod error;
pub mod index;
pub mod package;
pub mod ptype;
pub mod stage;

pub use discover::discover;
pub use error::PkgError;
pub use index::PackageIndex;
pub use package::Package;
pub use ptype::PkgType;
pub use stage::{StageEntry, StageKey};
