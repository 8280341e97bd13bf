//! drover - executor load drill
//!
//! Entry point for the `drover` binary. Builds an executor from
//! configuration, runs a drill against it and reports the outcome.

mod cli;

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use drover::config::{self, DroverConfig};
use drover::drill::{self, DrillPlan, DrillReport};
use drover::logging::{self, LogGuards};
use drover::{version, Error, Executor, Result};

use crate::cli::{Cli, Commands};

fn main() {
    if let Err(e) = run(Cli::parse()) {
        error!(error = %e.format_for_log(), "Command failed");
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    // Commands that don't need full logging use a simple setup
    match cli.command {
        Commands::Version { json } => version::print_version(json),
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand)
        }
        Commands::Run {
            config,
            tasks,
            task_ms,
            panic_every,
            mode,
            await_secs,
            json,
        } => {
            let config = DroverConfig::load(config.as_deref())?;

            // The guards must be kept alive until the drill has finished
            let _log_guards = init_logging_from_config(&config, cli.verbose, cli.quiet)?;

            let build = version::build_info();
            info!(
                version = %build.full_version(),
                target = %build.target,
                profile = %build.profile,
                "Starting drover"
            );

            let plan = DrillPlan {
                tasks,
                task_duration: Duration::from_millis(task_ms),
                panic_every,
                mode: mode.into(),
                await_timeout: Duration::from_secs(await_secs),
            };
            run_drill(&config, &plan, json)
        }
    }
}

/// Initialize logging from configuration
fn init_logging_from_config(config: &DroverConfig, verbose: u8, quiet: bool) -> Result<LogGuards> {
    logging::init_logging(&config.logging, verbose, quiet)
}

/// Build an executor, run the drill and print its report
fn run_drill(config: &DroverConfig, plan: &DrillPlan, json: bool) -> Result<()> {
    let executor_config = config.executor.executor_config();
    info!(
        workers = executor_config.worker_threads,
        keep_alive_ms = config.executor.thread_keep_alive_ms,
        "Configuration loaded"
    );

    let executor = Executor::new(executor_config)?;
    let report = drill::run_drill(&executor, plan)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.terminated {
        return Err(Error::TerminationTimeout {
            timeout_ms: plan.await_timeout.as_millis() as u64,
        });
    }
    Ok(())
}

/// Print a drill report for humans
fn print_report(report: &DrillReport) {
    println!("Drill ({:?} shutdown)", report.mode);
    println!("  Started:    {}", report.started_at.to_rfc3339());
    println!("  Submitted:  {}", report.submitted);
    println!("  Completed:  {}", report.completed);
    println!("  Panicked:   {}", report.panicked);
    println!("  Not run:    {}", report.not_run);
    println!(
        "  Late submit rejected: {}",
        if report.rejected_after_shutdown { "yes" } else { "no" }
    );
    println!("  Final state: {}", report.final_state);
    println!("  Terminated: {}", if report.terminated { "yes" } else { "no" });
    println!("  Elapsed:    {} ms", report.elapsed_ms);
}

/// Handle config subcommands
fn handle_config_command(subcommand: cli::ConfigSubcommand) -> Result<()> {
    use cli::ConfigSubcommand;

    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = DroverConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            DroverConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
