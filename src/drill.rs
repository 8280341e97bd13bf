//! Load drill
//!
//! Pushes a batch of sleeping tasks through an [`Executor`], shuts it down
//! and reports what ran, what was cancelled and whether it terminated in time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::executor::{Executor, ExecutorStats, RunState};

// ─────────────────────────────────────────────────────────────────
// Drill Plan
// ─────────────────────────────────────────────────────────────────

/// How the drill stops the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    /// `shutdown()`: queued tasks still run
    Graceful,
    /// `shutdown_now()`: queued tasks are cancelled
    Now,
}

/// What the drill submits and how long it waits
#[derive(Debug, Clone)]
pub struct DrillPlan {
    pub tasks: usize,
    pub task_duration: Duration,
    /// Every k-th task panics instead of sleeping
    pub panic_every: Option<usize>,
    pub mode: ShutdownMode,
    pub await_timeout: Duration,
}

impl Default for DrillPlan {
    fn default() -> Self {
        Self {
            tasks: 100,
            task_duration: Duration::from_millis(20),
            panic_every: None,
            mode: ShutdownMode::Graceful,
            await_timeout: Duration::from_secs(60),
        }
    }
}

impl DrillPlan {
    fn panics_at(&self, index: usize) -> bool {
        matches!(self.panic_every, Some(k) if k > 0 && (index + 1) % k == 0)
    }
}

// ─────────────────────────────────────────────────────────────────
// Drill Report
// ─────────────────────────────────────────────────────────────────

/// Outcome of a drill
#[derive(Debug, Clone, Serialize)]
pub struct DrillReport {
    pub started_at: DateTime<Utc>,
    pub mode: ShutdownMode,
    pub submitted: u64,
    /// Task bodies that ran to the end
    pub completed: u64,
    /// Tasks handed back by `shutdown_now`
    pub not_run: u64,
    pub panicked: u64,
    /// Whether a submission after shutdown was refused
    pub rejected_after_shutdown: bool,
    pub terminated: bool,
    pub final_state: RunState,
    pub elapsed_ms: u64,
    pub stats: ExecutorStats,
}

impl DrillReport {
    /// True when every submitted task is accounted for exactly once
    pub fn is_consistent(&self) -> bool {
        !self.terminated || self.completed + self.panicked + self.not_run == self.submitted
    }
}

// ─────────────────────────────────────────────────────────────────
// Drill Runner
// ─────────────────────────────────────────────────────────────────

/// Run a drill against `executor`, leaving it shut down
pub fn run_drill(executor: &Executor, plan: &DrillPlan) -> Result<DrillReport> {
    info!(
        tasks = plan.tasks,
        task_ms = plan.task_duration.as_millis() as u64,
        mode = ?plan.mode,
        "Starting drill"
    );
    let started_at = Utc::now();
    let start = Instant::now();
    let finished = Arc::new(AtomicU64::new(0));

    for index in 0..plan.tasks {
        let finished = finished.clone();
        let duration = plan.task_duration;
        if plan.panics_at(index) {
            executor.execute(move || panic!("drill task {} failed", index))?;
        } else {
            executor.execute(move || {
                thread::sleep(duration);
                finished.fetch_add(1, Ordering::SeqCst);
            })?;
        }
    }
    debug!(submitted = plan.tasks, "All drill tasks submitted");

    let not_run = match plan.mode {
        ShutdownMode::Graceful => {
            executor.shutdown();
            0
        }
        ShutdownMode::Now => executor.shutdown_now().len() as u64,
    };

    let rejected_after_shutdown = executor.execute(|| {}).is_err();
    if !rejected_after_shutdown {
        warn!("Executor accepted a task after shutdown");
    }

    let terminated = executor.await_termination(plan.await_timeout);
    let stats = executor.stats();

    let report = DrillReport {
        started_at,
        mode: plan.mode,
        submitted: plan.tasks as u64,
        completed: finished.load(Ordering::SeqCst),
        not_run,
        panicked: stats.panicked,
        rejected_after_shutdown,
        terminated,
        final_state: executor.state(),
        elapsed_ms: start.elapsed().as_millis() as u64,
        stats,
    };

    info!(
        completed = report.completed,
        not_run = report.not_run,
        panicked = report.panicked,
        terminated = report.terminated,
        elapsed_ms = report.elapsed_ms,
        "Drill finished"
    );

    Ok(report)
}
