//! Script-based runner: an interpreter invoked on fit and assess scripts.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::{
    ModelArtifact, ModelError, ModelStep, ProcessInvocation, SummaryTableArtifact,
    TopicModelRunner,
};

/// Interpreter used when none is configured.
pub const DEFAULT_INTERPRETER: &str = "Rscript";
/// Per-process timeout used when none is configured.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(3600);
/// Environment variable carrying the expected model artifact path.
pub const ARTIFACT_ENV: &str = "TOPICLABEL_ARTIFACT";
/// Environment variable carrying the expected summary table path.
pub const SUMMARY_ENV: &str = "TOPICLABEL_SUMMARY";

/// Runs `<interpreter> <fit_script> <corpus> <run_label>` and
/// `<interpreter> <assess_script> <artifact> <corpus>`.
///
/// Both processes run inside the workspace directory. The fit step must
/// produce `<workspace>/<run_label>.Rdata`; the assess step must produce
/// `<workspace>/<run_label>_topics.csv`.
#[derive(Debug, Clone)]
pub struct ScriptModelRunner {
    interpreter: PathBuf,
    fit_script: PathBuf,
    assess_script: PathBuf,
    timeout: Duration,
}

impl ScriptModelRunner {
    #[must_use]
    pub fn new(
        interpreter: impl Into<PathBuf>,
        fit_script: impl Into<PathBuf>,
        assess_script: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            fit_script: fit_script.into(),
            assess_script: assess_script.into(),
            timeout: DEFAULT_PROCESS_TIMEOUT,
        }
    }

    /// Sets the per-process timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Where the fit step must leave the serialized model.
    #[must_use]
    pub fn artifact_path(workspace: &Path, run_label: &str) -> PathBuf {
        workspace.join(format!("{run_label}.Rdata"))
    }

    /// Where the assess step must leave the summary table.
    #[must_use]
    pub fn summary_path(workspace: &Path, run_label: &str) -> PathBuf {
        workspace.join(format!("{run_label}_topics.csv"))
    }

    fn invocation(
        &self,
        step: ModelStep,
        script: &Path,
        operands: [OsString; 2],
        run_label: &str,
        workspace: &Path,
    ) -> ProcessInvocation {
        let workspace = absolute(workspace);
        let artifact = Self::artifact_path(&workspace, run_label);
        let summary = Self::summary_path(&workspace, run_label);
        let expected_artifact = match step {
            ModelStep::Fit => artifact.clone(),
            ModelStep::Assess => summary.clone(),
        };
        let mut args = vec![absolute(script).into_os_string()];
        args.extend(operands);
        ProcessInvocation {
            step,
            run_label: run_label.to_string(),
            program: self.interpreter.clone(),
            args,
            env: vec![
                (ARTIFACT_ENV.to_string(), artifact.into_os_string()),
                (SUMMARY_ENV.to_string(), summary.into_os_string()),
            ],
            working_dir: Some(workspace),
            expected_artifact,
            timeout: self.timeout,
        }
    }
}

/// Resolves `path` against the current directory, since children run
/// inside the workspace.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[async_trait]
impl TopicModelRunner for ScriptModelRunner {
    fn name(&self) -> &str {
        "script"
    }

    #[instrument(skip(self), fields(corpus = %corpus.display()))]
    async fn fit(
        &self,
        corpus: &Path,
        run_label: &str,
        workspace: &Path,
    ) -> Result<ModelArtifact, ModelError> {
        tokio::fs::create_dir_all(workspace)
            .await
            .map_err(|source| ModelError::Workspace {
                path: workspace.to_path_buf(),
                source,
            })?;

        let run = self
            .invocation(
                ModelStep::Fit,
                &self.fit_script,
                [absolute(corpus).into_os_string(), run_label.into()],
                run_label,
                workspace,
            )
            .run()
            .await?
            .into_verified()?;
        info!(elapsed_ms = run.elapsed.as_millis(), "Model fitted");

        Ok(ModelArtifact {
            run_label: run_label.to_string(),
            path: run.expected_artifact.clone(),
            workspace: workspace.to_path_buf(),
            run: Some(run),
        })
    }

    #[instrument(skip(self, artifact), fields(artifact = %artifact.path.display()))]
    async fn assess(
        &self,
        artifact: &ModelArtifact,
        corpus: &Path,
    ) -> Result<SummaryTableArtifact, ModelError> {
        let run = self
            .invocation(
                ModelStep::Assess,
                &self.assess_script,
                [
                    absolute(&artifact.path).into_os_string(),
                    absolute(corpus).into_os_string(),
                ],
                &artifact.run_label,
                &artifact.workspace,
            )
            .run()
            .await?
            .into_verified()?;
        info!(elapsed_ms = run.elapsed.as_millis(), "Model assessed");

        let path = run.expected_artifact.clone();
        SummaryTableArtifact::load(&path, Some(run))
    }
}
