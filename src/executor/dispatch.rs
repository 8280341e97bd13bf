//! Dispatch substrate
//!
//! A [`Dispatcher`] takes a job, runs it on some worker and reports back
//! through a completion callback. It owns all worker concurrency; the
//! coordinator never touches threads.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, error, info};

use crate::error::{Error, Result};

use super::ExecutorConfig;

/// Work handed to the substrate
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Callback invoked exactly once after a job ran
pub type OnComplete = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// How a dispatched job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The job returned normally
    Completed,
    /// The job panicked; carries the panic message
    Panicked(String),
}

/// Capability to run jobs asynchronously and report their completion
pub trait Dispatcher: Send + Sync + 'static {
    /// Schedule `job`, then call `on_complete` with its outcome.
    ///
    /// Must return without waiting for the job to run. A panicking job must
    /// still produce an [`Outcome`]; use [`run_contained`]. A panicking
    /// `on_complete` must not be swallowed; use [`complete_or_abort`].
    fn submit(&self, job: Job, on_complete: OnComplete);

    /// Release worker resources without blocking the caller
    fn shutdown(&self) {}
}

/// Run a job, turning a panic into [`Outcome::Panicked`]
pub fn run_contained(job: Job) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(()) => Outcome::Completed,
        Err(payload) => Outcome::Panicked(panic_message(payload.as_ref())),
    }
}

/// Run executor bookkeeping, aborting the process if it panics.
///
/// Bookkeeping panics are invariant breaches in the ledger, never task
/// failures, and must not be absorbed by a worker.
pub fn abort_on_panic<R>(step: &str, f: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            error!(
                step,
                panic = %panic_message(payload.as_ref()),
                "Executor invariant violated, aborting"
            );
            std::process::abort();
        }
    }
}

/// Hand `outcome` to the completion callback under [`abort_on_panic`]
pub fn complete_or_abort(on_complete: OnComplete, outcome: Outcome) {
    abort_on_panic("complete", move || on_complete(outcome));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tokio Dispatcher
// ─────────────────────────────────────────────────────────────────

/// Default substrate: tokio's blocking pool, capped at `worker_threads`.
///
/// Jobs beyond the cap wait in tokio's queue until a worker frees up; idle
/// workers exit after `thread_keep_alive`.
pub struct TokioDispatcher {
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    workers: usize,
}

impl TokioDispatcher {
    /// Start the worker pool
    pub fn new(config: &ExecutorConfig) -> Result<Self> {
        let workers = config.worker_threads.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name(config.thread_name.clone())
            .thread_keep_alive(config.thread_keep_alive)
            .build()
            .map_err(|e| Error::dispatch_unavailable(format!("failed to build worker pool: {}", e)))?;

        info!(
            workers,
            thread_name = %config.thread_name,
            keep_alive_ms = config.thread_keep_alive.as_millis() as u64,
            "Dispatch substrate started"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            workers,
        })
    }

    /// Maximum number of jobs running at once
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Dispatcher for TokioDispatcher {
    fn submit(&self, job: Job, on_complete: OnComplete) {
        // Neither step can unwind: job panics are contained and callback panics abort.
        let _ = self
            .handle
            .spawn_blocking(move || complete_or_abort(on_complete, run_contained(job)));
    }

    fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            // Running jobs keep their threads; jobs not yet started are dropped.
            runtime.shutdown_background();
            debug!("Dispatch substrate released");
        }
    }
}

impl Drop for TokioDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
