//! Compile-job stream and bounded worker pool.
//!
//! The resolver guarantees the job stream it emits is a deterministic
//! function of its inputs, so build reproducibility does not depend on
//! scheduling. This crate supplies the other half: a bounded pool that
//! runs jobs with no ordering guarantee, latches the first failure,
//! refuses new work after it, and lets in-flight jobs run to completion.

pub mod job;
pub mod pool;

pub use job::{CompileJob, CompilerConfig, collect_jobs};
pub use pool::{BuildError, JobPool};
