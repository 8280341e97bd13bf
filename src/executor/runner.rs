//! Executor facade
//!
//! [`Executor`] is the public executor-service contract. It validates and
//! admits work through the [`Coordinator`], hands it to a [`Dispatcher`],
//! and blocks callers in [`Executor::await_termination`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::Result;
use crate::task::{Task, TaskId};

use super::{
    abort_on_panic, Coordinator, Dispatcher, ExecutorStats, Job, OnComplete, RunState,
    TokioDispatcher,
};

// ─────────────────────────────────────────────────────────────────
// Executor Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the default worker pool
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum tasks running in parallel
    pub worker_threads: usize,

    /// Name given to worker threads
    pub thread_name: String,

    /// How long an idle worker thread lingers before exiting
    pub thread_keep_alive: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            thread_name: "drover-worker".to_string(),
            thread_keep_alive: Duration::from_secs(10),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────

/// Runs fire-and-forget tasks with graceful and immediate shutdown.
///
/// Cloning an `Executor` yields another handle to the same executor, so any
/// number of threads can submit concurrently. When the last handle is dropped,
/// queued tasks are discarded and the worker pool is released.
///
/// A queued task whose closure captures an `Executor` clone is itself a
/// handle: the executor stays alive until that task has run or has been
/// returned by [`shutdown_now`](Self::shutdown_now) and dropped. Call
/// `shutdown_now` explicitly when tasks hold handles and must not run.
#[derive(Clone)]
pub struct Executor {
    shared: Arc<Shared>,
}

struct Shared {
    coordinator: Arc<Coordinator>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Executor {
    /// Create an executor backed by a tokio worker pool
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        let dispatcher = TokioDispatcher::new(&config)?;
        Ok(Self::with_dispatcher(Arc::new(dispatcher)))
    }

    /// Create an executor on top of a custom dispatch substrate
    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            shared: Arc::new(Shared {
                coordinator: Arc::new(Coordinator::new()),
                dispatcher,
            }),
        }
    }

    /// Submit a task for asynchronous execution.
    ///
    /// Fails with [`Error::Rejected`](crate::Error::Rejected) once
    /// [`shutdown`](Self::shutdown) or [`shutdown_now`](Self::shutdown_now)
    /// has been called; a rejected task is dropped without running.
    pub fn execute<F>(&self, task: F) -> Result<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        let coordinator = &self.shared.coordinator;
        let id = coordinator.admit(Box::new(task))?;

        let starter = coordinator.clone();
        let job: Job = Box::new(move || {
            if let Some(task) = abort_on_panic("start", || starter.begin(id)) {
                task.run();
            }
        });
        let finisher = coordinator.clone();
        let on_complete: OnComplete = Box::new(move |outcome| finisher.finish(id, outcome));

        self.shared.dispatcher.submit(job, on_complete);
        Ok(id)
    }

    /// Stop accepting tasks; already submitted tasks still run.
    ///
    /// Returns immediately. Calling it again has no effect.
    pub fn shutdown(&self) {
        self.shared.coordinator.shutdown();
    }

    /// Stop accepting tasks and cancel every task that has not started.
    ///
    /// Running tasks are not interrupted. Returns the cancelled tasks in
    /// submission order; a second call returns an empty list.
    pub fn shutdown_now(&self) -> Vec<Task> {
        self.shared.coordinator.shutdown_now()
    }

    /// True once either shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.state().is_shutdown()
    }

    /// True once shutdown was requested and no task is pending
    pub fn is_terminated(&self) -> bool {
        self.state().is_terminated()
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        self.shared.coordinator.state()
    }

    /// Counters snapshot
    pub fn stats(&self) -> ExecutorStats {
        self.shared.coordinator.stats()
    }

    /// Block the calling thread until termination or until `timeout` elapses.
    ///
    /// Returns `true` if the executor terminated. The wait is bounded only by
    /// `timeout`, never by timeouts inside the worker pool.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let terminated = self.shared.coordinator.await_termination(timeout);
        if !terminated {
            let stats = self.stats();
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                running = stats.running,
                queued = stats.queued,
                "Executor still busy after await timeout"
            );
        }
        terminated
    }

    /// Resolve once the executor has terminated
    pub async fn terminated(&self) {
        let mut rx = self.shared.coordinator.subscribe();
        // The sender lives in the coordinator, which `self` keeps alive.
        let _ = rx.wait_for(RunState::is_terminated).await;
    }

    /// Async counterpart of [`await_termination`](Self::await_termination)
    pub async fn await_termination_async(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.terminated()).await.is_ok()
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let discarded = self.coordinator.shutdown_now();
        if !discarded.is_empty() {
            info!(discarded = discarded.len(), "Executor dropped with queued tasks");
        }
        self.dispatcher.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
