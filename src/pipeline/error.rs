//! Run-level error type and its stable failure classification.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::corpus::CorpusError;
use crate::model::ModelError;

/// Structured classification of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required column is missing from an input or summary table.
    SchemaError,
    /// An external step could not start or exited with failure.
    ExternalProcessFailure,
    /// An external step exited successfully without its output file.
    MissingArtifact,
    /// An external step exceeded the configured timeout.
    TimedOut,
    /// The input is unreadable, malformed, or in an unsupported format.
    InputError,
    /// Run bookkeeping (directories, output files, manifest) failed.
    Io,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SchemaError => "schema_error",
            Self::ExternalProcessFailure => "external_process_failure",
            Self::MissingArtifact => "missing_artifact",
            Self::TimedOut => "timed_out",
            Self::InputError => "input_error",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading, validating, or writing a table failed.
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    /// An external model step failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The input corpus has no documents left to label.
    #[error("corpus {path} has no documents to label")]
    EmptyCorpus { path: PathBuf },

    /// Run directory or manifest bookkeeping failed.
    #[error("run bookkeeping failed at {path}: {source}")]
    RunIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Creates a bookkeeping IO error.
    pub fn run_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RunIo {
            path: path.into(),
            source,
        }
    }

    /// Classifies the error for manifests and CLI output.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Corpus(err) | Self::Model(ModelError::SummaryTable(err)) => corpus_kind(err),
            Self::Model(ModelError::Spawn { .. } | ModelError::ProcessFailed { .. }) => {
                FailureKind::ExternalProcessFailure
            }
            Self::Model(ModelError::MissingArtifact { .. }) => FailureKind::MissingArtifact,
            Self::Model(ModelError::TimedOut { .. }) => FailureKind::TimedOut,
            Self::Model(ModelError::Workspace { .. }) | Self::RunIo { .. } => FailureKind::Io,
            Self::EmptyCorpus { .. } => FailureKind::InputError,
        }
    }

    /// Human-readable diagnostic, including captured process output.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

fn corpus_kind(err: &CorpusError) -> FailureKind {
    match err {
        CorpusError::MissingColumn { .. } | CorpusError::ColumnLength { .. } => {
            FailureKind::SchemaError
        }
        CorpusError::Io { .. } => FailureKind::Io,
        CorpusError::UnsupportedFormat { .. } | CorpusError::Malformed { .. } => {
            FailureKind::InputError
        }
    }
}
