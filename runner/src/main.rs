mod config;
mod executors;
mod plan;

use clap::Parser;
use config::{Arguments, ConfigErrors, RunConfig, RunnerConfig};
use executors::{Executor, ExecutorError};
use plan::{JobPlan, PlanError};
use std::{env, process::exit};
use thiserror::Error;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    // stdout is reserved for the resource summary and echoed commands
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(arguments: Arguments) -> Result<(), RunnerError> {
    let config = match arguments.config {
        Some(ref path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };

    if config.preflight_checks() {
        return Err(ConfigErrors::Preflight.into());
    }

    let working_dir = env::current_dir().map_err(ConfigErrors::WorkingDirectory)?;
    let run_config = RunConfig::resolve(&arguments, config, working_dir);
    debug!(config = ?run_config, "Resolved configuration");

    println!("\n{}", run_config.request);
    let plan = JobPlan::build(&arguments.raw_files, run_config.request)?;
    println!("{plan}");

    Executor::new(run_config.emit, run_config.submit, run_config.script_dir).execute(&plan)?;

    Ok(())
}

fn main() {
    let arguments = Arguments::parse();
    init_tracing(arguments.verbose);

    if let Err(error) = run(arguments) {
        error!("{error}");
        eprintln!("Exiting...");

        exit(1)
    }
}
