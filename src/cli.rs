//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for drover.

use clap::{Parser, Subcommand, ValueEnum};

use drover::drill::ShutdownMode;

/// drover - fire-and-forget task executor
///
/// Runs load drills against the executor: submits a batch of tasks,
/// shuts the executor down and reports whether it terminated in time.
#[derive(Parser, Debug)]
#[command(name = "drover")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a load drill against a fresh executor
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "DROVER_CONFIG")]
        config: Option<String>,

        /// Number of tasks to submit
        #[arg(short, long, default_value = "100")]
        tasks: usize,

        /// How long each task sleeps, in milliseconds
        #[arg(long, default_value = "20")]
        task_ms: u64,

        /// Make every K-th task panic
        #[arg(long, value_name = "K")]
        panic_every: Option<usize>,

        /// How the executor is shut down after submission
        #[arg(short, long, value_enum, default_value_t = ModeArg::Graceful)]
        mode: ModeArg,

        /// Seconds to wait for termination
        #[arg(long, default_value = "60")]
        await_secs: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version and build information
    Version {
        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Shutdown mode as accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Let queued tasks finish
    Graceful,
    /// Cancel queued tasks
    Now,
}

impl From<ModeArg> for ShutdownMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Graceful => ShutdownMode::Graceful,
            ModeArg::Now => ShutdownMode::Now,
        }
    }
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
