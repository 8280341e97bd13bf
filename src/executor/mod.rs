//! Executor service
//!
//! Handles the task lifecycle:
//! - Admitting tasks while the executor accepts work
//! - Dispatching them to the worker substrate
//! - Tracking pending work and detecting termination
//! - Graceful and immediate shutdown

mod dispatch;
mod runner;
mod state;

pub use dispatch::*;
pub use runner::*;
pub use state::*;
