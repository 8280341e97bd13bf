//! drover - a fire-and-forget task executor with graceful and immediate shutdown
//!
//! Tasks are submitted with [`Executor::execute`] and run on a bounded worker
//! pool. [`Executor::shutdown`] stops admission and lets queued work drain;
//! [`Executor::shutdown_now`] also hands back every task that has not started.
//! [`Executor::await_termination`] blocks until nothing is pending.
//!
//! ```no_run
//! use std::time::Duration;
//! use drover::{Executor, ExecutorConfig};
//!
//! # fn main() -> drover::Result<()> {
//! let executor = Executor::new(ExecutorConfig::default())?;
//! executor.execute(|| println!("hello from a worker"))?;
//! executor.shutdown();
//! assert!(executor.await_termination(Duration::from_secs(5)));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod drill;
pub mod error;
pub mod executor;
pub mod logging;
pub mod task;
pub mod version;

pub use error::{Error, ErrorCode, Result};
pub use executor::{
    Dispatcher, Executor, ExecutorConfig, ExecutorStats, Job, OnComplete, Outcome, RunState,
    TokioDispatcher,
};
pub use task::{Task, TaskId};
