//! End-to-end run orchestration.
//!
//! A run walks `Start → Normalized → ModelFitted → ModelAssessed → Assigned →
//! Completed`. Any failure moves it to the absorbing `Failed` state, aborts
//! the remaining steps, removes completed outputs and records the failure in
//! the run manifest. Nothing is retried.

mod error;
mod layout;
mod manifest;

pub use error::{FailureKind, PipelineError};
pub use layout::{
    LABELED_CORPUS_STEM, MANIFEST_FILE, MODEL_DIR, NORMALIZED_CORPUS_FILE, RunLayout,
    TOPIC_SUMMARY_FILE, sanitize_batch_name,
};
pub use manifest::{ManifestFailure, RunManifest, RunStatus};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::assign::AssignmentStrategy;
use crate::corpus::{Corpus, NORMALIZED_KEYWORDS_COLUMN};
use crate::labeling::{LabelingReport, classify_corpus, summarize_table};
use crate::model::TopicModelRunner;
use crate::topics::{TextNormalizer, TopicCatalog};

/// Default directory for run outputs.
pub const DEFAULT_OUTPUT_DIR: &str = "runs";

/// States of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Start,
    Normalized,
    ModelFitted,
    ModelAssessed,
    Assigned,
    Completed,
    Failed,
}

impl RunState {
    /// Successful states in order (excludes `Failed`).
    pub const SEQUENCE: [RunState; 6] = [
        Self::Start,
        Self::Normalized,
        Self::ModelFitted,
        Self::ModelAssessed,
        Self::Assigned,
        Self::Completed,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Normalized => "normalized",
            Self::ModelFitted => "model_fitted",
            Self::ModelAssessed => "model_assessed",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// True for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Callback invoked on every state transition.
pub type TransitionObserver = Box<dyn Fn(RunState) + Send + Sync>;

/// Run-level settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent of all run directories.
    pub output_dir: PathBuf,
    /// Overrides the input file stem as batch name.
    pub batch_name: Option<String>,
    /// Summarization strategy for the topic summary table.
    pub strategy: AssignmentStrategy,
    /// Remove documents with an empty abstract before normalizing.
    pub drop_empty_abstracts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            batch_name: None,
            strategy: AssignmentStrategy::default(),
            drop_empty_abstracts: false,
        }
    }
}

/// Outputs of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_label: String,
    pub run_dir: PathBuf,
    pub states: Vec<RunState>,
    pub normalized_corpus: PathBuf,
    pub topic_summary: PathBuf,
    pub labeled_corpus: PathBuf,
    pub manifest: PathBuf,
    pub summary: LabelingReport,
    pub classification: LabelingReport,
}

/// A failed run: one structured error plus where it happened.
#[derive(Debug, Error)]
#[error("run failed after {failed_in} ({kind}): {error}", kind = .error.kind())]
pub struct RunFailure {
    #[source]
    pub error: PipelineError,
    /// Last state reached before the failure.
    pub failed_in: RunState,
    /// Run directory, when one was created.
    pub run_dir: Option<PathBuf>,
    /// Manifest path, when it could be written.
    pub manifest: Option<PathBuf>,
}

impl RunFailure {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }

    #[must_use]
    pub fn diagnostic(&self) -> String {
        self.error.diagnostic()
    }
}

/// Tracks visited states and notifies the observer.
struct StateTracker<'a> {
    states: Vec<RunState>,
    observer: Option<&'a (dyn Fn(RunState) + Send + Sync)>,
}

impl<'a> StateTracker<'a> {
    fn new(observer: Option<&'a (dyn Fn(RunState) + Send + Sync)>) -> Self {
        let tracker = Self {
            states: vec![RunState::Start],
            observer,
        };
        tracker.notify(RunState::Start);
        tracker
    }

    fn current(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Start)
    }

    fn advance(&mut self, next: RunState) {
        info!(from = %self.current(), to = %next, "Run state transition");
        self.states.push(next);
        self.notify(next);
    }

    fn notify(&self, state: RunState) {
        if let Some(observer) = self.observer {
            observer(state);
        }
    }
}

/// Sequences normalization, the external model steps and assignment.
pub struct PipelineOrchestrator {
    runner: Arc<dyn TopicModelRunner>,
    normalizer: TextNormalizer,
    catalog: TopicCatalog,
    config: PipelineConfig,
    observer: Option<TransitionObserver>,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("runner", &self.runner.name())
            .field("catalog", &self.catalog.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn new(
        runner: Arc<dyn TopicModelRunner>,
        normalizer: TextNormalizer,
        catalog: TopicCatalog,
        config: PipelineConfig,
    ) -> Self {
        Self {
            runner,
            normalizer,
            catalog,
            config,
            observer: None,
        }
    }

    /// Registers a callback for state transitions.
    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(RunState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the whole pipeline on the corpus at `input`.
    ///
    /// Required columns are checked before a run directory exists or any
    /// external process starts; such failures carry no manifest.
    ///
    /// # Errors
    /// Returns a [`RunFailure`] carrying the first error, its
    /// [`FailureKind`] and the state the run had reached.
    #[instrument(skip(self), fields(input = %input.display(), runner = self.runner.name()))]
    pub async fn run(&self, input: &Path) -> Result<RunReport, RunFailure> {
        let started = Instant::now();
        let mut tracker = StateTracker::new(self.observer.as_deref());

        let (corpus, dropped) = match self.load_corpus(input) {
            Ok(loaded) => loaded,
            Err(error) => {
                tracker.advance(RunState::Failed);
                warn!(kind = %error.kind(), "Run failed before start");
                return Err(RunFailure {
                    error,
                    failed_in: RunState::Start,
                    run_dir: None,
                    manifest: None,
                });
            }
        };

        let batch = self
            .config
            .batch_name
            .clone()
            .unwrap_or_else(|| corpus.batch_name());
        let layout = match RunLayout::create(&self.config.output_dir, &batch, corpus.format()) {
            Ok(layout) => layout,
            Err(error) => {
                tracker.advance(RunState::Failed);
                return Err(RunFailure {
                    error,
                    failed_in: RunState::Start,
                    run_dir: None,
                    manifest: None,
                });
            }
        };
        info!(run_label = layout.run_label(), "Run started");

        let mut manifest = RunManifest {
            run_label: layout.run_label().to_string(),
            input: input.to_path_buf(),
            status: RunStatus::Completed,
            final_state: RunState::Completed,
            states: Vec::new(),
            runner: self.runner.name().to_string(),
            strategy: self.config.strategy,
            artifacts: Vec::new(),
            partial: Vec::new(),
            error: None,
            summary: None,
            classification: None,
            dropped_documents: dropped,
            elapsed_ms: 0,
        };

        match self
            .execute(corpus, &layout, &mut tracker, &mut manifest, started)
            .await
        {
            Ok((summary, classification)) => {
                tracker.advance(RunState::Completed);
                info!(
                    run_label = layout.run_label(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Run completed"
                );
                Ok(RunReport {
                    run_label: layout.run_label().to_string(),
                    run_dir: layout.root().to_path_buf(),
                    states: tracker.states,
                    normalized_corpus: layout.normalized_corpus(),
                    topic_summary: layout.topic_summary(),
                    labeled_corpus: layout.labeled_corpus(),
                    manifest: layout.manifest(),
                    summary,
                    classification,
                })
            }
            Err(error) => {
                let failed_in = tracker.current();
                tracker.advance(RunState::Failed);
                warn!(kind = %error.kind(), state = %failed_in, error = %error, "Run failed");

                for removed in layout.remove_completed_outputs() {
                    debug!(path = %removed.display(), "Removed output of failed run");
                }
                manifest.status = RunStatus::Failed;
                manifest.final_state = RunState::Failed;
                manifest.states = tracker.states.clone();
                manifest.artifacts.clear();
                manifest.partial = layout.partial_files();
                manifest.error = Some(ManifestFailure {
                    kind: error.kind(),
                    diagnostic: error.diagnostic(),
                    failed_in,
                });
                manifest.elapsed_ms = elapsed_ms(started);

                let manifest_path = match manifest.write(&layout.manifest()) {
                    Ok(()) => Some(layout.manifest()),
                    Err(write_error) => {
                        warn!(error = %write_error, "Cannot write manifest of failed run");
                        None
                    }
                };
                Err(RunFailure {
                    error,
                    failed_in,
                    run_dir: Some(layout.root().to_path_buf()),
                    manifest: manifest_path,
                })
            }
        }
    }

    /// Loads the corpus and applies the configured document filter.
    fn load_corpus(&self, input: &Path) -> Result<(Corpus, usize), PipelineError> {
        let mut corpus = Corpus::load(input)?;
        let dropped = if self.config.drop_empty_abstracts {
            corpus.drop_empty_abstracts()
        } else {
            0
        };
        if dropped > 0 {
            info!(dropped, "Removed documents without an abstract");
        }
        if corpus.is_empty() {
            return Err(PipelineError::EmptyCorpus {
                path: input.to_path_buf(),
            });
        }
        Ok((corpus, dropped))
    }

    /// Steps from normalization to the completed manifest.
    async fn execute(
        &self,
        mut corpus: Corpus,
        layout: &RunLayout,
        tracker: &mut StateTracker<'_>,
        manifest: &mut RunManifest,
        started: Instant,
    ) -> Result<(LabelingReport, LabelingReport), PipelineError> {
        // Start → Normalized
        let normalized_path = layout.normalized_corpus();
        let mut normalized = corpus.clone();
        let keywords: Vec<&str> = corpus.documents().map(|doc| doc.keywords).collect();
        let normalized_keywords = self.normalizer.normalize_all(&keywords);
        let empty = normalized_keywords.iter().filter(|k| k.is_empty()).count();
        if empty > 0 {
            info!(empty, "Documents with no keyword signal");
        }
        normalized.set_column(NORMALIZED_KEYWORDS_COLUMN, normalized_keywords)?;
        normalized.write(&normalized_path)?;
        tracker.advance(RunState::Normalized);

        // Normalized → ModelFitted
        let artifact = self
            .runner
            .fit(&normalized_path, layout.run_label(), &layout.model_dir())
            .await?;
        tracker.advance(RunState::ModelFitted);

        // ModelFitted → ModelAssessed
        let mut summary_artifact = self.runner.assess(&artifact, &normalized_path).await?;
        tracker.advance(RunState::ModelAssessed);

        // ModelAssessed → Assigned
        let summary_name = summary_artifact.path.display().to_string();
        let summary = summarize_table(
            &mut summary_artifact.table,
            &summary_name,
            &self.normalizer,
            &self.catalog,
            self.config.strategy,
        )?;
        summary_artifact.table.write(&layout.topic_summary())?;

        let topics = summary_artifact.summary_topics()?;
        let classification = classify_corpus(&mut corpus, &topics)?;
        corpus.write(&layout.labeled_corpus())?;
        tracker.advance(RunState::Assigned);

        // Assigned → Completed: the manifest is the last file written.
        manifest.states = tracker.states.clone();
        manifest.states.push(RunState::Completed);
        manifest.artifacts = vec![
            normalized_path,
            artifact.path,
            layout.topic_summary(),
            layout.labeled_corpus(),
        ];
        manifest.summary = Some(summary.clone());
        manifest.classification = Some(classification.clone());
        manifest.elapsed_ms = elapsed_ms(started);
        manifest.write(&layout.manifest())?;

        Ok((summary, classification))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ModelArtifact, ModelError, ModelStep, SummaryTableArtifact};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const SUMMARY: &str = "Topic label,Keywords,source text\n\
        Topic 1,irrigation;water;efficiency,a\n\
        Topic 2,pest;insects;management,b\n";

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Succeed,
        FailFit,
        SkipArtifact,
        BadSummary,
    }

    struct FakeRunner {
        mode: Mode,
        assess_calls: AtomicUsize,
    }

    impl FakeRunner {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                assess_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TopicModelRunner for FakeRunner {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fit(
            &self,
            corpus: &Path,
            run_label: &str,
            workspace: &Path,
        ) -> Result<ModelArtifact, ModelError> {
            assert!(corpus.is_file());
            if self.mode == Mode::FailFit {
                return Err(ModelError::ProcessFailed {
                    step: ModelStep::Fit,
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: "model did not converge".to_string(),
                });
            }
            fs::create_dir_all(workspace).unwrap();
            let path = workspace.join(format!("{run_label}.Rdata"));
            if self.mode == Mode::SkipArtifact {
                return Err(ModelError::MissingArtifact {
                    step: ModelStep::Fit,
                    path,
                });
            }
            fs::write(&path, "model").unwrap();
            Ok(ModelArtifact {
                run_label: run_label.to_string(),
                path,
                workspace: workspace.to_path_buf(),
                run: None,
            })
        }

        async fn assess(
            &self,
            artifact: &ModelArtifact,
            _corpus: &Path,
        ) -> Result<SummaryTableArtifact, ModelError> {
            self.assess_calls.fetch_add(1, Ordering::SeqCst);
            let path = artifact.workspace.join("topics.csv");
            let body = if self.mode == Mode::BadSummary {
                "Topic label,source text\nTopic 1,a\n"
            } else {
                SUMMARY
            };
            fs::write(&path, body).unwrap();
            SummaryTableArtifact::load(&path, None)
        }
    }

    fn write_corpus(dir: &Path) -> PathBuf {
        let path = dir.join("papers.csv");
        fs::write(
            &path,
            "Title,Keywords,Abstract\n\
             Drip irrigation efficiency,Irrig;water,x\n\
             Pest insects in maize,pests;IPM,y\n\
             Untitled,,\n",
        )
        .unwrap();
        path
    }

    fn orchestrator(runner: Arc<FakeRunner>, output_dir: &Path) -> PipelineOrchestrator {
        let config = PipelineConfig {
            output_dir: output_dir.to_path_buf(),
            ..PipelineConfig::default()
        };
        PipelineOrchestrator::new(
            runner,
            TextNormalizer::default(),
            TopicCatalog::from_labels(["Water Use Efficiency", "Integrated Pest Management"]),
            config,
        )
    }

    #[tokio::test]
    async fn test_successful_run_visits_every_state() {
        let dir = TempDir::new().unwrap();
        let input = write_corpus(dir.path());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pipeline = orchestrator(FakeRunner::new(Mode::Succeed), &dir.path().join("runs"))
            .with_observer(move |state| sink.lock().unwrap().push(state));

        let report = pipeline.run(&input).await.unwrap();

        assert_eq!(report.states, RunState::SEQUENCE);
        assert_eq!(*seen.lock().unwrap(), RunState::SEQUENCE);
        assert!(report.run_label.starts_with("papers-"));
        assert!(report.topic_summary.is_file());
        assert!(report.labeled_corpus.ends_with("labeled_corpus.csv"));

        let labeled = fs::read_to_string(&report.labeled_corpus).unwrap();
        assert!(labeled.starts_with("Title,Keywords,Abstract,Assigned Topic"));
        assert!(labeled.contains("Water Use Efficiency"));
        assert!(labeled.contains("Unlabeled"));

        let manifest = RunManifest::read(&report.manifest).unwrap();
        assert_eq!(manifest.status, RunStatus::Completed);
        assert_eq!(manifest.artifacts.len(), 4);
        assert_eq!(manifest.summary.unwrap().documents, 2);
        assert_eq!(manifest.classification.unwrap().documents, 3);
    }

    #[tokio::test]
    async fn test_fit_failure_skips_assess_and_records_manifest() {
        let dir = TempDir::new().unwrap();
        let input = write_corpus(dir.path());
        let runner = FakeRunner::new(Mode::FailFit);
        let pipeline = orchestrator(Arc::clone(&runner), &dir.path().join("runs"));

        let failure = pipeline.run(&input).await.unwrap_err();

        assert_eq!(failure.kind(), FailureKind::ExternalProcessFailure);
        assert_eq!(failure.failed_in, RunState::Normalized);
        assert!(failure.diagnostic().contains("model did not converge"));
        assert_eq!(runner.assess_calls.load(Ordering::SeqCst), 0);

        let manifest = RunManifest::read(&failure.manifest.unwrap()).unwrap();
        assert_eq!(manifest.status, RunStatus::Failed);
        assert_eq!(manifest.states.last(), Some(&RunState::Failed));
        assert!(manifest.artifacts.is_empty());
        assert_eq!(manifest.partial.len(), 1);
        let run_dir = failure.run_dir.unwrap();
        assert!(!run_dir.join(TOPIC_SUMMARY_FILE).exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_distinct_failure() {
        let dir = TempDir::new().unwrap();
        let input = write_corpus(dir.path());
        let pipeline = orchestrator(FakeRunner::new(Mode::SkipArtifact), &dir.path().join("runs"));

        let failure = pipeline.run(&input).await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::MissingArtifact);
        assert_eq!(failure.failed_in, RunState::Normalized);
    }

    #[tokio::test]
    async fn test_summary_without_keywords_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let input = write_corpus(dir.path());
        let pipeline = orchestrator(FakeRunner::new(Mode::BadSummary), &dir.path().join("runs"));

        let failure = pipeline.run(&input).await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::SchemaError);
        assert_eq!(failure.failed_in, RunState::ModelFitted);
    }

    #[tokio::test]
    async fn test_missing_input_column_fails_before_any_process() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("papers.csv");
        fs::write(&input, "Title,Abstract\nA,x\n").unwrap();
        let runs = dir.path().join("runs");
        let pipeline = orchestrator(FakeRunner::new(Mode::Succeed), &runs);

        let failure = pipeline.run(&input).await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::SchemaError);
        assert_eq!(failure.failed_in, RunState::Start);
        assert!(failure.run_dir.is_none());
        assert!(!runs.exists());
    }

    #[tokio::test]
    async fn test_drop_empty_abstracts_can_empty_the_corpus() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("papers.csv");
        fs::write(&input, "Title,Keywords,Abstract\nA,soil,\n").unwrap();
        let mut pipeline = orchestrator(FakeRunner::new(Mode::Succeed), &dir.path().join("runs"));
        pipeline.config.drop_empty_abstracts = true;

        let failure = pipeline.run(&input).await.unwrap_err();
        assert!(matches!(failure.error, PipelineError::EmptyCorpus { .. }));
        assert_eq!(failure.kind(), FailureKind::InputError);
    }

    #[test]
    fn test_run_state_labels() {
        assert_eq!(RunState::ModelFitted.to_string(), "model_fitted");
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Assigned.is_terminal());
    }
}
