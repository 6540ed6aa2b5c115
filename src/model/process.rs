//! Running one external step as a child process with captured output.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::{ExternalModelRun, ModelError, ModelStep};

/// A fully specified child-process call.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub step: ModelStep,
    pub run_label: String,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, OsString)>,
    /// Working directory; inherited when `None`.
    pub working_dir: Option<PathBuf>,
    /// File the step is contracted to produce.
    pub expected_artifact: PathBuf,
    pub timeout: Duration,
}

impl ProcessInvocation {
    /// Runs the process to completion, capturing stdout and stderr.
    ///
    /// Stdin is closed. On timeout the child is killed and
    /// `ModelError::TimedOut` is returned. A non-zero exit is not an error
    /// here; see [`ExternalModelRun::into_verified`].
    ///
    /// # Errors
    /// Returns `ModelError::Spawn` if the process cannot be started and
    /// `ModelError::TimedOut` if it outlives the timeout.
    #[instrument(skip(self), fields(step = %self.step, program = %self.program.display()))]
    pub async fn run(self) -> Result<ExternalModelRun, ModelError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| ModelError::Spawn {
            step: self.step,
            program: self.program.clone(),
            source,
        })?;
        debug!(pid = child.id(), "Process started");

        let started = Instant::now();
        // Dropping the pending future drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ModelError::Spawn {
                step: self.step,
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Process timed out, killed");
                return Err(ModelError::TimedOut {
                    step: self.step,
                    timeout: self.timeout,
                });
            }
        };
        let elapsed = started.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(
            exit_code = ?output.status.code(),
            elapsed_ms = elapsed.as_millis(),
            %stdout,
            %stderr,
            "Process finished"
        );

        Ok(ExternalModelRun {
            step: self.step,
            run_label: self.run_label,
            program: self.program,
            args: self.args,
            expected_artifact: self.expected_artifact,
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout,
            stderr,
            elapsed,
        })
    }
}
