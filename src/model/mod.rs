//! Boundary to the external statistical topic model.
//!
//! Fitting and assessment are black boxes behind [`TopicModelRunner`]. Each
//! step returns a validated artifact or a [`ModelError`]; callers never probe
//! the filesystem themselves. Validation is two-tier: the process exit status
//! first, then the existence of the file the step is contracted to produce.

mod error;
mod process;
mod script;

pub use error::ModelError;
pub use process::ProcessInvocation;
pub use script::{
    ARTIFACT_ENV, DEFAULT_INTERPRETER, DEFAULT_PROCESS_TIMEOUT, SUMMARY_ENV, ScriptModelRunner,
};

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::corpus::{CorpusError, KEYWORDS_COLUMN, SUMMARY_TOPIC_COLUMN, Table};
use crate::topics::TopicCatalog;

/// Topic identifier column of the summary table.
pub const TOPIC_LABEL_COLUMN: &str = "Topic label";
/// Representative source text column of the summary table.
pub const SOURCE_TEXT_COLUMN: &str = "source text";
/// Columns every summary table must carry.
pub const SUMMARY_REQUIRED_COLUMNS: [&str; 3] =
    [TOPIC_LABEL_COLUMN, KEYWORDS_COLUMN, SOURCE_TEXT_COLUMN];

/// The two external steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStep {
    Fit,
    Assess,
}

impl ModelStep {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Assess => "assess",
        }
    }
}

impl fmt::Display for ModelStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of one external process invocation.
///
/// Created by the runner, checked by [`Self::into_verified`], then carried
/// inside the resulting artifact for diagnostics.
#[derive(Debug, Clone)]
pub struct ExternalModelRun {
    pub step: ModelStep,
    pub run_label: String,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// File the step is contracted to produce.
    pub expected_artifact: PathBuf,
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ExternalModelRun {
    /// Applies the two-tier check: exit status, then artifact existence.
    ///
    /// # Errors
    /// Returns `ModelError::ProcessFailed` (with captured output) on a failed
    /// exit and `ModelError::MissingArtifact` when a successful exit left no
    /// artifact behind.
    pub fn into_verified(self) -> Result<Self, ModelError> {
        if !self.success {
            return Err(ModelError::ProcessFailed {
                step: self.step,
                exit_code: self.exit_code,
                stdout: self.stdout,
                stderr: self.stderr,
            });
        }
        if !self.expected_artifact.is_file() {
            return Err(ModelError::MissingArtifact {
                step: self.step,
                path: self.expected_artifact,
            });
        }
        debug!(step = %self.step, artifact = %self.expected_artifact.display(), "Artifact verified");
        Ok(self)
    }
}

/// A fitted model on disk.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub run_label: String,
    /// Serialized model file.
    pub path: PathBuf,
    /// Directory the runner writes into.
    pub workspace: PathBuf,
    /// The fitting invocation; `None` for artifacts not produced by a process.
    pub run: Option<ExternalModelRun>,
}

/// A validated topic-keyword summary table.
#[derive(Debug, Clone)]
pub struct SummaryTableArtifact {
    pub path: PathBuf,
    pub table: Table,
    /// The assessment invocation; `None` for tables not produced by a process.
    pub run: Option<ExternalModelRun>,
}

impl SummaryTableArtifact {
    /// Reads the table at `path` and checks its required columns.
    ///
    /// # Errors
    /// Returns `ModelError::SummaryTable` if the table cannot be read or a
    /// required column is missing.
    #[instrument(skip(run), fields(path = %path.display()))]
    pub fn load(path: &Path, run: Option<ExternalModelRun>) -> Result<Self, ModelError> {
        let table = Table::read(path)?;
        let name = path.display().to_string();
        for column in SUMMARY_REQUIRED_COLUMNS {
            table.require_column(&name, column)?;
        }
        debug!(topics = table.len(), "Summary table loaded");
        Ok(Self {
            path: path.to_path_buf(),
            table,
            run,
        })
    }

    /// Topics for classification: `label_column` as label, `Keywords` as text.
    ///
    /// # Errors
    /// Returns `CorpusError::MissingColumn` if `label_column` is absent.
    pub fn topics(&self, label_column: &str) -> Result<TopicCatalog, CorpusError> {
        TopicCatalog::from_table(
            &self.table,
            &self.path.display().to_string(),
            label_column,
            KEYWORDS_COLUMN,
        )
    }

    /// Topics keyed by the `Summary topic` column added by summarization.
    ///
    /// # Errors
    /// Returns `CorpusError::MissingColumn` if summarization has not run.
    pub fn summary_topics(&self) -> Result<TopicCatalog, CorpusError> {
        self.topics(SUMMARY_TOPIC_COLUMN)
    }
}

/// External topic-model capability.
///
/// Implementations must be usable behind `Arc<dyn TopicModelRunner>`.
#[async_trait]
pub trait TopicModelRunner: Send + Sync {
    /// Short name for logs and manifests.
    fn name(&self) -> &str;

    /// Fits a model on the normalized corpus at `corpus`, writing into
    /// `workspace`.
    async fn fit(
        &self,
        corpus: &Path,
        run_label: &str,
        workspace: &Path,
    ) -> Result<ModelArtifact, ModelError>;

    /// Produces the topic-keyword summary table for a fitted model.
    async fn assess(
        &self,
        artifact: &ModelArtifact,
        corpus: &Path,
    ) -> Result<SummaryTableArtifact, ModelError>;
}
