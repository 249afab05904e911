mod pbs;
mod slurm;
pub mod submit;

#[cfg(test)]
mod render_test;

use crate::plan::{Batch, JobPlan, Resources};
use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use submit::{submit, SubmitOutcome, SubmitSettings};

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to write job script {path:?}: {source}")]
    WriteUnit {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to run submission command `{command}`: {source}")]
    SpawnSubmit {
        command: String,
        source: std::io::Error,
    },
    #[error("Submission command is empty")]
    EmptySubmitCommand,
    #[error("Failed to report submission: {0}")]
    Report(#[from] io::Error),
}

/// Supported batch schedulers
/// (enum dispatch, every dialect only differs in a handful of strings)
#[derive(Deserialize, Serialize, ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Schedulers {
    #[default]
    Pbs,
    Slurm,
}

impl Schedulers {
    /// resource request lines placed right below the shebang
    pub fn directives(&self, resources: &Resources) -> Vec<String> {
        match self {
            Self::Pbs => pbs::directives(resources),
            Self::Slurm => slurm::directives(resources),
        }
    }

    pub fn submit_command(&self) -> &'static str {
        match self {
            Self::Pbs => pbs::SUBMIT_COMMAND,
            Self::Slurm => slurm::SUBMIT_COMMAND,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pbs => pbs::EXTENSION,
            Self::Slurm => slurm::EXTENSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// how a batch is turned into a job script
pub struct EmitSettings {
    pub scheduler: Schedulers,
    pub executable: String,
    pub input_flag: String,
    pub prefix: String,
    pub working_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// a rendered job script, not yet on disk
pub struct UnitDescriptor {
    pub index: usize,
    pub name: String,
    pub script: String,
}

/// Single quote `word` for bash unless it only consists of characters the shell leaves alone.
/// An embedded `'` becomes `'\''`.
pub fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+@%,".contains(c));

    if plain {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

impl EmitSettings {
    fn invocation(&self, item: &str) -> String {
        if self.input_flag.is_empty() {
            format!("{} {}", self.executable, quote(item))
        } else {
            format!("{} {} {}", self.executable, self.input_flag, quote(item))
        }
    }
}

/// Render the job script for `batch`.
/// Every worker slot becomes one backgrounded line running its files one after another,
/// the trailing `wait` keeps the job alive until all slots are done.
pub fn render(batch: &Batch, settings: &EmitSettings) -> UnitDescriptor {
    let mut lines = vec!["#!/bin/bash".to_owned()];

    lines.extend(settings.scheduler.directives(&batch.resources));
    lines.push(String::new());
    lines.push(format!(
        "cd {}",
        quote(&settings.working_dir.to_string_lossy())
    ));

    for (slot, items) in batch.slots.iter().enumerate() {
        let commands = items
            .iter()
            .map(|item| settings.invocation(item))
            .join("; ");

        lines.push(format!(
            "{commands} > stdout_{}_{slot}.txt &",
            batch.index
        ));
    }
    lines.push("wait".to_owned());

    let mut script = lines.join("\n");
    script.push('\n');

    UnitDescriptor {
        index: batch.index,
        name: format!(
            "{}_{}.{}",
            settings.prefix,
            batch.index,
            settings.scheduler.extension()
        ),
        script,
    }
}

/// persist `unit` in `directory`, returning the path handed to the scheduler
pub fn write(unit: &UnitDescriptor, directory: &Path) -> Result<PathBuf, ExecutorError> {
    let path = directory.join(&unit.name);

    fs::write(&path, &unit.script).map_err(|source| ExecutorError::WriteUnit {
        path: path.clone(),
        source,
    })?;
    debug!(path = ?path, index = unit.index, "Wrote job script");

    Ok(path)
}

#[derive(Debug)]
pub struct UnitReport {
    pub name: String,
    pub path: PathBuf,
    pub outcome: Result<SubmitOutcome, ExecutorError>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
}

impl RunReport {
    pub fn submitted(&self) -> usize {
        self.units
            .iter()
            .filter(|unit| matches!(unit.outcome, Ok(SubmitOutcome::Accepted { .. })))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.units
            .iter()
            .filter(|unit| {
                matches!(
                    unit.outcome,
                    Err(_) | Ok(SubmitOutcome::Rejected { .. })
                )
            })
            .count()
    }
}

/// Writes and submits the jobs of a plan, strictly one after another
#[derive(Debug, Clone)]
pub struct Executor {
    emit: EmitSettings,
    submit: SubmitSettings,
    script_dir: PathBuf,
}

impl Executor {
    pub fn new(emit: EmitSettings, submit: SubmitSettings, script_dir: PathBuf) -> Self {
        Self {
            emit,
            submit,
            script_dir,
        }
    }

    /// Render, write and submit every batch in index order.
    /// A failing submission is logged and does not stop the remaining ones, only a script
    /// that cannot be written aborts the run.
    pub fn execute(&self, plan: &JobPlan) -> Result<RunReport, ExecutorError> {
        self.execute_to(plan, &mut io::stdout().lock())
    }

    /// same as `execute`, echoed commands and job ids go to `out`
    #[instrument(skip_all, fields(jobs = plan.len(), go = self.submit.go), level = "info")]
    pub fn execute_to<W: Write>(
        &self,
        plan: &JobPlan,
        out: &mut W,
    ) -> Result<RunReport, ExecutorError> {
        let mut report = RunReport::default();

        for batch in plan.iter() {
            let unit = render(batch, &self.emit);
            let path = write(&unit, &self.script_dir)?;
            let outcome = submit(&path, &self.submit, out);

            match &outcome {
                Ok(SubmitOutcome::Rejected { code }) => {
                    warn!(unit = %unit.name, code = ?code, "Scheduler rejected job");
                }
                Err(error) => {
                    warn!(unit = %unit.name, "Failed to submit job: {error}");
                }
                Ok(_) => {}
            }

            report.units.push(UnitReport {
                name: unit.name,
                path,
                outcome,
            });
        }

        info!(
            "Done with {} job{}, {} submitted, {} failed",
            report.units.len(),
            if report.units.len() == 1 { "" } else { "s" },
            report.submitted(),
            report.failed()
        );

        Ok(report)
    }
}
