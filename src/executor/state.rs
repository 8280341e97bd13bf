//! Executor state tracking
//!
//! The [`Coordinator`] is the single point of truth for the run state, the
//! pending set and the counters. Every mutation happens under one mutex, so
//! termination detection always sees the state and the pending set together.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::task::{Runnable, Task, TaskId};

use super::Outcome;

// ─────────────────────────────────────────────────────────────────
// Run State
// ─────────────────────────────────────────────────────────────────

/// Lifecycle of an executor
///
/// Transitions only move forward: `Accepting` to `Draining` or `Stopping`,
/// `Draining` to `Stopping`, and either of those to `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Accepting new tasks
    #[default]
    Accepting,
    /// Graceful shutdown requested, queued tasks still run
    Draining,
    /// Immediate shutdown requested, queued tasks were cancelled
    Stopping,
    /// Shutdown requested and nothing is pending
    Terminated,
}

impl RunState {
    /// True once any shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        !matches!(self, RunState::Accepting)
    }

    /// True once the executor has fully terminated
    pub fn is_terminated(&self) -> bool {
        matches!(self, RunState::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Accepting => "accepting",
            RunState::Draining => "draining",
            RunState::Stopping => "stopping",
            RunState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────
// Executor Stats
// ─────────────────────────────────────────────────────────────────

/// Counters snapshot, taken atomically with the run state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    /// Tasks admitted
    pub submitted: u64,
    /// Submissions refused after shutdown
    pub rejected: u64,
    /// Tasks that returned normally
    pub completed: u64,
    /// Tasks that panicked
    pub panicked: u64,
    /// Tasks cancelled before they started
    pub cancelled: u64,
    /// Tasks currently executing
    pub running: usize,
    /// Tasks admitted but not yet started
    pub queued: usize,
}

impl ExecutorStats {
    /// Tasks that left the pending set, by any route
    pub fn settled(&self) -> u64 {
        self.completed + self.panicked + self.cancelled
    }
}

// ─────────────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────────────

enum Slot {
    Queued(Task),
    Running,
}

#[derive(Default)]
struct Ledger {
    state: RunState,
    next_id: u64,
    pending: HashMap<TaskId, Slot>,
    /// Cancelled tasks whose jobs are still sitting in the substrate queue
    abandoned: HashSet<TaskId>,
    running: usize,
    submitted: u64,
    rejected: u64,
    completed: u64,
    panicked: u64,
    cancelled: u64,
}

/// Serializes every state transition and pending-set mutation
pub struct Coordinator {
    ledger: Mutex<Ledger>,
    termination: Condvar,
    state_tx: watch::Sender<RunState>,
}

impl Coordinator {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(RunState::Accepting);
        Self {
            ledger: Mutex::new(Ledger::default()),
            termination: Condvar::new(),
            state_tx,
        }
    }

    /// Admit a task into the pending set, or reject it if shutdown began
    pub fn admit(&self, body: Runnable) -> Result<TaskId> {
        let mut ledger = self.ledger.lock();
        if ledger.state != RunState::Accepting {
            ledger.rejected += 1;
            let state = ledger.state;
            drop(ledger);
            warn!(state = %state, "Task rejected after shutdown");
            return Err(Error::Rejected { state });
        }

        ledger.next_id += 1;
        let id = TaskId::new(ledger.next_id);
        ledger.pending.insert(id, Slot::Queued(Task::new(id, body)));
        ledger.submitted += 1;
        debug!(task_id = %id, pending = ledger.pending.len(), "Task admitted");
        Ok(id)
    }

    /// Called by a worker picking the task up.
    ///
    /// Returns `None` when the task was cancelled while it sat in the queue.
    pub fn begin(&self, id: TaskId) -> Option<Task> {
        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;
        match ledger.pending.get_mut(&id) {
            Some(slot) => match std::mem::replace(slot, Slot::Running) {
                Slot::Queued(task) => {
                    ledger.running += 1;
                    debug!(task_id = %id, "Task started");
                    Some(task)
                }
                Slot::Running => panic!("{} started twice", id),
            },
            None if ledger.abandoned.contains(&id) => {
                debug!(task_id = %id, "Skipping cancelled task");
                None
            }
            None => panic!("start reported for unknown {}", id),
        }
    }

    /// Called once per dispatched job when the substrate reports it finished
    pub fn finish(&self, id: TaskId, outcome: Outcome) {
        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;
        match ledger.pending.remove(&id) {
            Some(Slot::Running) => {}
            Some(Slot::Queued(_)) => panic!("{} reported complete before it started", id),
            None if ledger.abandoned.remove(&id) => return,
            None => panic!("completion reported for unknown {}", id),
        }

        ledger.running -= 1;
        match outcome {
            Outcome::Completed => {
                ledger.completed += 1;
                debug!(task_id = %id, "Task completed");
            }
            Outcome::Panicked(message) => {
                ledger.panicked += 1;
                error!(task_id = %id, panic = %message, "Task panicked");
            }
        }
        self.check_terminated(ledger);
    }

    /// Stop admitting; queued and running tasks still complete
    pub fn shutdown(&self) {
        let mut guard = self.ledger.lock();
        if guard.state != RunState::Accepting {
            return;
        }
        self.transition(&mut guard, RunState::Draining);
        info!(
            running = guard.running,
            queued = guard.pending.len() - guard.running,
            "Graceful shutdown requested"
        );
        self.check_terminated(&mut guard);
    }

    /// Stop admitting and pull every task that has not started yet
    pub fn shutdown_now(&self) -> Vec<Task> {
        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;
        match ledger.state {
            RunState::Accepting | RunState::Draining => {
                self.transition(ledger, RunState::Stopping)
            }
            RunState::Stopping | RunState::Terminated => return Vec::new(),
        }

        let (queued, running): (Vec<_>, Vec<_>) = std::mem::take(&mut ledger.pending)
            .into_iter()
            .partition(|(_, slot)| matches!(slot, Slot::Queued(_)));
        ledger.pending.extend(running);

        let mut not_run: Vec<Task> = queued
            .into_iter()
            .filter_map(|(id, slot)| match slot {
                Slot::Queued(task) => {
                    ledger.abandoned.insert(id);
                    Some(task)
                }
                Slot::Running => None,
            })
            .collect();
        not_run.sort_by_key(Task::id);
        ledger.cancelled += not_run.len() as u64;

        info!(
            cancelled = not_run.len(),
            running = ledger.running,
            "Immediate shutdown requested"
        );
        self.check_terminated(ledger);
        not_run
    }

    /// Block until terminated or until `timeout` elapses
    pub fn await_termination(&self, timeout: Duration) -> bool {
        // Overflowing deadlines mean "wait forever".
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.ledger.lock();
        while !guard.state.is_terminated() {
            match deadline {
                Some(deadline) => {
                    if self.termination.wait_until(&mut guard, deadline).timed_out() {
                        return guard.state.is_terminated();
                    }
                }
                None => self.termination.wait(&mut guard),
            }
        }
        true
    }

    /// Watch channel carrying every state transition
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> RunState {
        self.ledger.lock().state
    }

    pub fn stats(&self) -> ExecutorStats {
        let ledger = self.ledger.lock();
        ExecutorStats {
            submitted: ledger.submitted,
            rejected: ledger.rejected,
            completed: ledger.completed,
            panicked: ledger.panicked,
            cancelled: ledger.cancelled,
            running: ledger.running,
            queued: ledger.pending.len() - ledger.running,
        }
    }

    fn transition(&self, ledger: &mut Ledger, next: RunState) {
        let previous = ledger.state;
        ledger.state = next;
        self.state_tx.send_replace(next);
        debug!(from = %previous, to = %next, "Executor state changed");
    }

    /// Terminate once a shutdown was requested and nothing is pending
    fn check_terminated(&self, ledger: &mut Ledger) {
        if matches!(ledger.state, RunState::Draining | RunState::Stopping)
            && ledger.pending.is_empty()
        {
            self.transition(ledger, RunState::Terminated);
            info!(
                completed = ledger.completed,
                panicked = ledger.panicked,
                cancelled = ledger.cancelled,
                "Executor terminated"
            );
            self.termination.notify_all();
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
