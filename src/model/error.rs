//! Error types for external topic-model steps.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::ModelStep;
use crate::corpus::CorpusError;

/// Errors raised while running or validating an external model step.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The process could not be started or waited on.
    #[error("failed to run {step} process '{program}': {source}")]
    Spawn {
        step: ModelStep,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and reported failure.
    #[error("{step} process failed with {}{}", exit_text(.exit_code), captured_output(.stdout, .stderr))]
    ProcessFailed {
        step: ModelStep,
        /// Exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The process reported success but its output file is absent.
    #[error("{step} process exited successfully but did not produce {path}")]
    MissingArtifact { step: ModelStep, path: PathBuf },

    /// The process did not finish within the configured timeout and was killed.
    #[error("{step} process timed out after {}s and was killed", .timeout.as_secs())]
    TimedOut { step: ModelStep, timeout: Duration },

    /// The runner workspace could not be prepared.
    #[error("cannot prepare model workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The summary table is unreadable or lacks a required column.
    #[error("invalid topic summary table: {0}")]
    SummaryTable(#[from] CorpusError),
}

impl ModelError {
    /// The step the error belongs to, when it is tied to one.
    #[must_use]
    pub fn step(&self) -> Option<ModelStep> {
        match self {
            Self::Spawn { step, .. }
            | Self::ProcessFailed { step, .. }
            | Self::MissingArtifact { step, .. }
            | Self::TimedOut { step, .. } => Some(*step),
            Self::Workspace { .. } => None,
            Self::SummaryTable(_) => Some(ModelStep::Assess),
        }
    }
}

fn exit_text(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

fn captured_output(stdout: &str, stderr: &str) -> String {
    let mut text = String::new();
    for (name, stream) in [("stderr", stderr), ("stdout", stdout)] {
        let trimmed = stream.trim();
        if !trimmed.is_empty() {
            text.push_str(&format!("\n  {name}: {trimmed}"));
        }
    }
    text
}
