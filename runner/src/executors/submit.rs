use super::ExecutorError;
use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitSettings {
    /// actually hand jobs to the scheduler, everything else is a dry run
    pub go: bool,
    /// echo every submission command on stdout
    pub verbose: bool,
    /// scheduler command, may carry extra arguments e.g. `qsub -q batch`
    pub command: String,
    pub working_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// nothing was run
    DryRun { command: String },
    /// the scheduler exited successfully, `job` holds whatever it printed (usually the job id)
    Accepted { job: String },
    Rejected { code: Option<i32> },
}

/// scripts inside the working directory are referred to by their bare name
fn script_argument<'a>(path: &'a Path, working_dir: &Path) -> &'a Path {
    match path.strip_prefix(working_dir) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative,
        _ => path,
    }
}

/// Hand the job script at `path` to the scheduler and block until the command exits.
/// Echoed commands and job ids are written to `out`, the scheduler's stderr is passed
/// through untouched.
pub fn submit<W: Write>(
    path: &Path,
    settings: &SubmitSettings,
    out: &mut W,
) -> Result<SubmitOutcome, ExecutorError> {
    let mut parts = settings.command.split_whitespace();
    let program = parts.next().ok_or(ExecutorError::EmptySubmitCommand)?;
    let script = script_argument(path, &settings.working_dir);
    let command = format!("{} {}", settings.command.trim(), script.display());

    if settings.verbose {
        writeln!(out, "{command}")?;
    }

    if !settings.go {
        debug!(%command, "Dry run, skipping submission");

        return Ok(SubmitOutcome::DryRun { command });
    }

    let output = Command::new(program)
        .args(parts)
        .arg(script)
        .current_dir(&settings.working_dir)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| ExecutorError::SpawnSubmit {
            command: command.clone(),
            source,
        })?;

    if output.status.success() {
        let job = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        info!(%command, %job, "Submitted job");

        if !job.is_empty() {
            writeln!(out, "{job}")?;
        }

        Ok(SubmitOutcome::Accepted { job })
    } else {
        Ok(SubmitOutcome::Rejected {
            code: output.status.code(),
        })
    }
}
