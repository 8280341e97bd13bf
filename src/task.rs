//! Submitted units of work
//!
//! A [`Task`] is a boxed `FnOnce()` plus the id it was admitted under. Tasks
//! cancelled by [`Executor::shutdown_now`](crate::Executor::shutdown_now) are
//! handed back to the caller, who may drop them or run them inline.

use std::fmt;

use serde::Serialize;

/// Boxed task body
pub type Runnable = Box<dyn FnOnce() + Send + 'static>;

/// Identifier assigned to a task at admission, unique per executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        TaskId(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// A unit of fire-and-forget work
pub struct Task {
    id: TaskId,
    body: Runnable,
}

impl Task {
    pub(crate) fn new(id: TaskId, body: Runnable) -> Self {
        Self { id, body }
    }

    /// Id the task was admitted under
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Run the task on the current thread, consuming it
    pub fn run(self) {
        (self.body)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id).finish_non_exhaustive()
    }
}
