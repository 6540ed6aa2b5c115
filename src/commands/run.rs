//! Run command handler: the full orchestrated pipeline with progress.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use topiclabel_core::pipeline::DEFAULT_OUTPUT_DIR;
use topiclabel_core::{
    DEFAULT_INTERPRETER, PipelineConfig, PipelineOrchestrator, RunState, ScriptModelRunner,
};
use tracing::debug;

use super::StaticTables;
use crate::ProcessExit;
use crate::app_config::FileConfig;
use crate::cli::RunArgs;

/// Transitions after `Start` on the success path.
const PROGRESS_STEPS: u64 = 5;

pub async fn run_pipeline_command(
    args: &RunArgs,
    config: &FileConfig,
    show_progress: bool,
) -> Result<ProcessExit> {
    let Some(fit_script) = args.fit_script.clone().or_else(|| config.fit_script.clone()) else {
        bail!("No fit script configured\n  Suggestion: Pass --fit-script or set `fit_script` in the config file");
    };
    let Some(assess_script) = args
        .assess_script
        .clone()
        .or_else(|| config.assess_script.clone())
    else {
        bail!(
            "No assess script configured\n  Suggestion: Pass --assess-script or set `assess_script` in the config file"
        );
    };
    let interpreter = args
        .rscript
        .clone()
        .or_else(|| config.rscript.clone())
        .unwrap_or_else(|| DEFAULT_INTERPRETER.into());
    let mut runner = ScriptModelRunner::new(interpreter, fit_script, assess_script);
    if let Some(secs) = args.timeout.or(config.process_timeout_secs) {
        runner = runner.with_timeout(Duration::from_secs(secs));
    }
    debug!(timeout_secs = runner.timeout().as_secs(), "Script runner configured");

    let tables = StaticTables::resolve(&args.tables, config)?;
    let pipeline_config = PipelineConfig {
        output_dir: args
            .output_dir
            .clone()
            .or_else(|| config.output_dir.clone())
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into()),
        batch_name: args.batch_name.clone(),
        strategy: tables.strategy,
        drop_empty_abstracts: args.drop_empty_abstracts
            || config.drop_empty_abstracts.unwrap_or(false),
    };

    let progress = progress_bar(show_progress);
    let observer = progress.clone();
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(runner),
        tables.normalizer,
        tables.catalog,
        pipeline_config,
    )
    .with_observer(move |state| observe(&observer, state));

    let result = orchestrator.run(&args.input).await;
    progress.finish_and_clear();

    match result {
        Ok(report) => {
            println!("Run {} completed", report.run_label);
            println!("  Topic summary:  {}", report.topic_summary.display());
            println!("  Labeled corpus: {}", report.labeled_corpus.display());
            println!(
                "  Documents: {} ({} unlabeled), topics: {}",
                report.classification.documents,
                report.classification.unlabeled,
                report.summary.documents
            );
            Ok(ProcessExit::Success)
        }
        Err(failure) => {
            eprintln!("{}: {}", failure.kind(), failure.diagnostic());
            if let Some(manifest) = &failure.manifest {
                eprintln!("  Manifest: {}", manifest.display());
            }
            Ok(ProcessExit::Failure)
        }
    }
}

fn progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(PROGRESS_STEPS);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message("Loading corpus");
    bar
}

fn observe(bar: &ProgressBar, state: RunState) {
    let message = match state {
        RunState::Start => "Loading corpus",
        RunState::Normalized => "Fitting topic model",
        RunState::ModelFitted => "Assessing topic model",
        RunState::ModelAssessed => "Assigning labels",
        RunState::Assigned => "Writing manifest",
        RunState::Completed => "Done",
        RunState::Failed => "Failed",
    };
    if !matches!(state, RunState::Start | RunState::Failed) {
        bar.inc(1);
    }
    bar.set_message(message);
}
