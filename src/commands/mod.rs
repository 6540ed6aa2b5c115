//! CLI command handlers.

mod classify;
mod run;
mod summarize;

pub use classify::run_classify_command;
pub use run::run_pipeline_command;
pub use summarize::run_summarize_command;

use std::path::{Path, PathBuf};

use anyhow::Result;
use topiclabel_core::{AssignmentStrategy, NormalizerTables, TextNormalizer, TopicCatalog};
use tracing::{debug, info};

use crate::app_config::FileConfig;
use crate::cli::TableArgs;

/// Normalizer, catalog and strategy resolved from CLI flags, config and
/// built-in defaults, in that order.
pub(crate) struct StaticTables {
    pub normalizer: TextNormalizer,
    pub catalog: TopicCatalog,
    pub strategy: AssignmentStrategy,
}

impl StaticTables {
    pub(crate) fn resolve(args: &TableArgs, config: &FileConfig) -> Result<Self> {
        let vocabulary = args.vocabulary.as_ref().or(config.vocabulary_file.as_ref());
        let normalizer = match vocabulary {
            Some(path) => {
                debug!(path = %path.display(), "Loading vocabulary file");
                TextNormalizer::new(&NormalizerTables::load(path)?)?
            }
            None => TextNormalizer::default(),
        };

        let catalog_file = args.catalog.as_ref().or(config.catalog_file.as_ref());
        let catalog = match catalog_file {
            Some(path) => topiclabel_core::load_catalog(path)?,
            None => TopicCatalog::agriculture(),
        };
        info!(topics = catalog.len(), "Topic catalog ready");

        let strategy = args
            .strategy
            .or(config.summary_strategy)
            .unwrap_or_default();
        Ok(Self {
            normalizer,
            catalog,
            strategy,
        })
    }
}

/// `<dir>/<stem>_<suffix>.<ext>` next to the input.
pub(crate) fn sibling_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "corpus".to_string(), |s| s.to_string_lossy().to_string());
    let extension = input
        .extension()
        .map_or_else(|| "csv".to_string(), |e| e.to_string_lossy().to_string());
    input.with_file_name(format!("{stem}_{suffix}.{extension}"))
}
