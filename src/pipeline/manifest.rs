//! `run.json`: the record of one run, written on success and on failure.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{FailureKind, PipelineError, RunState};
use crate::assign::AssignmentStrategy;
use crate::labeling::LabelingReport;

/// Outcome recorded in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Structured failure record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFailure {
    pub kind: FailureKind,
    pub diagnostic: String,
    /// Last state reached before the failure.
    pub failed_in: RunState,
}

/// Serialized run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_label: String,
    pub input: PathBuf,
    pub status: RunStatus,
    pub final_state: RunState,
    /// Every state visited, in order.
    pub states: Vec<RunState>,
    pub runner: String,
    pub strategy: AssignmentStrategy,
    /// Completed outputs (empty on failure).
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
    /// Intermediate files kept after a failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partial: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ManifestFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LabelingReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<LabelingReport>,
    /// Documents removed for lacking an abstract.
    #[serde(default)]
    pub dropped_documents: usize,
    pub elapsed_ms: u64,
}

impl RunManifest {
    /// Writes the manifest as pretty JSON.
    ///
    /// # Errors
    /// Returns `PipelineError::RunIo` on IO or serialization failure.
    #[instrument(skip(self), fields(path = %path.display(), status = ?self.status))]
    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let file = fs::File::create(path).map_err(|source| PipelineError::run_io(path, source))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|err| PipelineError::run_io(path, err.into()))?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|source| PipelineError::run_io(path, source))?;
        debug!("Run manifest written");
        Ok(())
    }

    /// Reads a manifest back from disk.
    ///
    /// # Errors
    /// Returns `PipelineError::RunIo` if the file is unreadable or invalid.
    pub fn read(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path).map_err(|source| PipelineError::run_io(path, source))?;
        serde_json::from_str(&raw).map_err(|err| PipelineError::run_io(path, err.into()))
    }
}
