//! Bounded worker pool.

use crate::job::CompileJob;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tern_core::AbortFlag;
use tern_core::event::{Event, EventSink, NullSink};
use thiserror::Error;
use tracing::debug;

static NULL_SINK: NullSink = NullSink;

/// Build failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// A compile job failed; this is the first failure observed.
    #[error("compile failed for {}: {message}", path.display())]
    JobFailed {
        /// The failing source file.
        path: PathBuf,
        /// Tool output.
        message: String,
    },

    /// The abort flag was raised between work units.
    #[error("build aborted")]
    Aborted,
}

/// Bounded pool for compile jobs.
///
/// Worker count defaults to the machine's virtual CPU count. Jobs have no
/// ordering guarantee. The first failure latches: the pool refuses to
/// start new jobs and returns that error once in-flight jobs finish.
pub struct JobPool<'a> {
    workers: usize,
    abort: AbortFlag,
    events: &'a dyn EventSink,
}

impl std::fmt::Debug for JobPool<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPool")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl Default for JobPool<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> JobPool<'a> {
    /// Pool sized to the machine's virtual CPU count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: num_cpus::get(),
            abort: AbortFlag::new(),
            events: &NULL_SINK,
        }
    }

    /// Override the worker count. Zero is clamped to one.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Observe `abort` between work units.
    #[must_use]
    pub fn with_abort(mut self, abort: AbortFlag) -> Self {
        self.abort = abort;
        self
    }

    /// Emit job progress through `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a dyn EventSink) -> Self {
        self.events = events;
        self
    }

    /// Configured worker count.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job through `exec`.
    ///
    /// `exec` returns the tool's error output on failure. Returns the
    /// first observed failure, or [`BuildError::Aborted`] if the abort
    /// flag stopped the stream.
    pub fn run<F>(&self, jobs: &[CompileJob], exec: F) -> Result<(), BuildError>
    where
        F: Fn(&CompileJob) -> Result<(), String> + Send + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .expect("worker pool construction cannot fail with clamped size");

        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<BuildError>> = Mutex::new(None);

        pool.scope(|scope| {
            for job in jobs {
                // Refuse new work after a failure or an abort; in-flight
                // jobs run to completion.
                if failed.load(Ordering::SeqCst) {
                    break;
                }
                if self.abort.is_set() {
                    let mut slot = first_error.lock();
                    if slot.is_none() {
                        *slot = Some(BuildError::Aborted);
                    }
                    break;
                }

                self.events.emit(&Event::JobQueued {
                    source: job.source.clone(),
                });

                let failed = &failed;
                let first_error = &first_error;
                let events = self.events;
                let exec = &exec;
                scope.spawn(move |_| match exec(job) {
                    Ok(()) => {
                        events.emit(&Event::JobFinished {
                            source: job.source.clone(),
                        });
                    }
                    Err(message) => {
                        debug!(source = %job.source.display(), "compile job failed");
                        failed.store(true, Ordering::SeqCst);
                        let mut slot = first_error.lock();
                        if slot.is_none() {
                            *slot = Some(BuildError::JobFailed {
                                path: job.source.clone(),
                                message,
                            });
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::CompilerConfig;
    use assert_matches::assert_matches;
    use std::sync::atomic::AtomicUsize;

    fn jobs(n: usize) -> Vec<CompileJob> {
        (0..n)
            .map(|i| CompileJob {
                source: PathBuf::from(format!("src/file{i}.c")),
                config: CompilerConfig::default(),
            })
            .collect()
    }

    #[test]
    fn runs_every_job_on_success() {
        let count = AtomicUsize::new(0);
        let pool = JobPool::new().with_workers(4);
        pool.run(&jobs(32), |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn failure_latches_and_is_returned() {
        let pool = JobPool::new().with_workers(2);
        let err = pool
            .run(&jobs(16), |job| {
                if job.source.ends_with("file3.c") {
                    Err("undefined reference".to_string())
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert_matches!(err, BuildError::JobFailed { path, .. } => {
            assert!(path.ends_with("file3.c"));
        });
    }

    #[test]
    fn abort_stops_new_work() {
        let abort = AbortFlag::new();
        abort.set();
        let pool = JobPool::new().with_workers(2).with_abort(abort);
        let count = AtomicUsize::new(0);
        let err = pool
            .run(&jobs(8), |_| {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err, BuildError::Aborted);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_workers_clamps_to_one() {
        assert_eq!(JobPool::new().with_workers(0).workers(), 1);
    }
}
