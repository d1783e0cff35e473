//! Package and syscfg co-resolution.
//!
//! Given seed packages (target, app, bsp, compiler), computes the
//! fixed-point closure of packages and configuration: conditional
//! dependencies are conditioned on configuration that is itself produced
//! by the closure. Also home of the staged-function ordering primitive
//! shared by init, shutdown, and custom-command emission.

pub mod error;
pub mod resolution;
pub mod resolver;
pub mod stage;

pub use error::{Problem, ResolveError};
pub use resolution::Resolution;
pub use resolver::Resolver;
pub use stage::order as order_stages;
