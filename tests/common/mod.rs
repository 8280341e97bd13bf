//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use drover::executor::run_contained;
use drover::{Dispatcher, Executor, ExecutorConfig, Job, OnComplete};
use parking_lot::Mutex;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Get the valid config fixture path
pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

/// Get the invalid config fixture path
pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// Executor on the tokio substrate with a short idle keep-alive
pub fn pooled_executor(workers: usize) -> Executor {
    Executor::new(ExecutorConfig {
        worker_threads: workers,
        thread_name: "drover-test".to_string(),
        thread_keep_alive: Duration::from_millis(200),
    })
    .expect("worker pool should start")
}

// ─────────────────────────────────────────────────────────────────
// Manual Dispatcher
// ─────────────────────────────────────────────────────────────────

/// Substrate that only runs jobs when the test says so
#[derive(Default)]
pub struct ManualDispatcher {
    queue: Mutex<VecDeque<(Job, OnComplete)>>,
    shutdowns: AtomicUsize,
}

impl ManualDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Jobs waiting to be run
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// How often the executor released this substrate
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Run the oldest job on the calling thread
    pub fn run_next(&self) -> bool {
        let next = self.queue.lock().pop_front();
        match next {
            Some((job, on_complete)) => {
                on_complete(run_contained(job));
                true
            }
            None => false,
        }
    }

    /// Run every queued job, returning how many ran
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Dispatcher for ManualDispatcher {
    fn submit(&self, job: Job, on_complete: OnComplete) {
        self.queue.lock().push_back((job, on_complete));
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Executor paired with the manual substrate driving it
pub fn manual_executor() -> (Executor, Arc<ManualDispatcher>) {
    let dispatcher = ManualDispatcher::new();
    let executor = Executor::with_dispatcher(dispatcher.clone());
    (executor, dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_dir_exists() {
        assert!(fixtures_dir().exists(), "Fixtures directory should exist");
    }

    #[test]
    fn test_valid_config_exists() {
        assert!(
            valid_config_fixture().exists(),
            "Valid config fixture should exist"
        );
    }

    #[test]
    fn test_invalid_config_exists() {
        assert!(
            invalid_config_fixture().exists(),
            "Invalid config fixture should exist"
        );
    }
}
