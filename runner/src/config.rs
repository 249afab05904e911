
use crate::{
    executors::{EmitSettings, Schedulers, SubmitSettings},
    plan::{PlanRequest, Walltime},
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config file {path:?}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config file is invalid: {0}")]
    InvalidConfig(#[from] serde_yaml::Error),
    #[error("Config failed the preflight checks")]
    Preflight,
    #[error("Unable to determine the working directory: {0}")]
    WorkingDirectory(std::io::Error),
}

/// Run ThermoRawFileParser with pbs jobs.
#[derive(Parser, Debug, Clone)]
#[command(name = "rawextract", version, about, long_about = None)]
pub struct Arguments {
    /// Should jobs be submitted? If this flag is not supplied, program will be a dry run.
    /// Required system resources will be printed but jobs will not be submitted.
    #[arg(short, long)]
    pub go: bool,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Specify number of jobs to split into.
    #[arg(short = 'n', long = "nJob", visible_alias = "jobs", default_value_t = 1)]
    pub jobs: usize,

    /// Number of processors to allocate per job.
    #[arg(short = 'p', long, default_value_t = 4)]
    pub ppn: usize,

    /// Amount of memory to allocate per job in gb. Default is 4 times the number of
    /// processors per job.
    #[arg(short, long)]
    pub mem: Option<u64>,

    /// Walltime per job in the format hh:mm:ss.
    #[arg(short, long, default_value = "12:00:00")]
    pub walltime: Walltime,

    /// Scheduler to write job scripts for, overrides the config file.
    #[arg(short, long, value_enum)]
    pub scheduler: Option<Schedulers>,

    /// Optional yaml config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// .raw files to parse.
    #[arg(required = true, num_args = 1..)]
    pub raw_files: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct RunnerConfig {
    pub scheduler: Schedulers,
    // converter invoked once per file inside the jobs
    pub executable: String,
    pub input_flag: String,
    #[serde(alias = "prefix")]
    pub script_prefix: String,
    // where job scripts are written, defaults to the working directory
    pub script_dir: Option<PathBuf>,
    // falls back to the scheduler's own submit command
    pub submit_command: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scheduler: Schedulers::default(),
            executable: "ThermoRawFileParser".to_owned(),
            input_flag: "-i".to_owned(),
            script_prefix: "rawExtract".to_owned(),
            script_dir: None,
            submit_command: None,
        }
    }
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let content = fs::read_to_string(path).map_err(|source| ConfigErrors::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigErrors> {
        // an empty file is a valid config consisting only of defaults
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(content)?)
    }

    /// Report every problem at once instead of piece-by-piece, returns `true` on errors
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if self.executable.trim().is_empty() {
            error!("executable must name the converter to run for every file");
            contains_error = true;
        } else if self.executable.chars().any(char::is_whitespace) {
            warn!(
                "executable '{}' contains whitespace, it will be split by the job shell",
                self.executable
            );
        }

        if self.script_prefix.is_empty() {
            error!("script_prefix cannot be empty");
            contains_error = true;
        } else if self.script_prefix.contains(std::path::MAIN_SEPARATOR) {
            error!(
                "script_prefix '{}' must be a file name, use script_dir for the location",
                self.script_prefix
            );
            contains_error = true;
        }

        if let Some(ref dir) = self.script_dir {
            if !dir.is_dir() {
                error!(
                    "script_dir {} is not a directory",
                    dir.to_string_lossy()
                );
                contains_error = true;
            }
        }

        if let Some(ref command) = self.submit_command {
            if command.trim().is_empty() {
                error!("submit_command cannot be empty, leave it out to use the scheduler default");
                contains_error = true;
            }
        }

        contains_error
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// config file and command line merged into the settings of a single invocation
pub struct RunConfig {
    pub request: PlanRequest,
    pub emit: EmitSettings,
    pub submit: SubmitSettings,
    pub script_dir: PathBuf,
}

impl RunConfig {
    pub fn resolve(arguments: &Arguments, config: RunnerConfig, working_dir: PathBuf) -> Self {
        let scheduler = arguments.scheduler.unwrap_or(config.scheduler);
        let script_dir = match config.script_dir {
            Some(dir) if dir.is_relative() => working_dir.join(dir),
            Some(dir) => dir,
            None => working_dir.clone(),
        };

        Self {
            request: PlanRequest {
                jobs: arguments.jobs,
                processors: arguments.ppn,
                memory: arguments.mem,
                walltime: arguments.walltime,
            },
            emit: EmitSettings {
                scheduler,
                executable: config.executable,
                input_flag: config.input_flag,
                prefix: config.script_prefix,
                working_dir: working_dir.clone(),
            },
            submit: SubmitSettings {
                go: arguments.go,
                verbose: arguments.verbose,
                command: config
                    .submit_command
                    .unwrap_or_else(|| scheduler.submit_command().to_owned()),
                working_dir,
            },
            script_dir,
        }
    }
}
