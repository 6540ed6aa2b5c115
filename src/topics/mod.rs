//! Keyword normalization and candidate-topic catalogs.
//!
//! Raw keyword fields are cleaned by [`TextNormalizer`] using static
//! [`NormalizerTables`]. Candidate topics come either from a predefined
//! [`TopicCatalog`] (summarization mode) or from the topic table produced by
//! the external model (classification mode).

mod catalog;
mod normalizer;
mod vocabulary;

pub use catalog::{TopicCandidate, TopicCatalog};
pub use normalizer::{TextNormalizer, clean_text};
pub use vocabulary::{DEFAULT_DELIMITER, NormalizerTables};

use anyhow::{Context, Result};
use std::path::Path;
use tracing::instrument;

/// Separator between a label and its keyword text in catalog files.
const CATALOG_TEXT_SEPARATOR: char = '|';

/// Loads a topic catalog from a file (one topic per line).
///
/// Each line is either `Label` (the label is also the vectorized text) or
/// `Label | keyword text`. Blank lines and lines starting with `#` are
/// skipped.
///
/// # Errors
/// Returns error if the file cannot be read or a line has an empty label.
#[instrument]
pub fn load_catalog(path: &Path) -> Result<TopicCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read topics file '{}'", path.display()))?;

    let mut candidates = Vec::new();
    for (line_index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let candidate = match line.split_once(CATALOG_TEXT_SEPARATOR) {
            Some((label, text)) => TopicCandidate::new(label.trim(), text.trim()),
            None => TopicCandidate::from_label(line),
        };
        if candidate.label.is_empty() {
            anyhow::bail!(
                "Empty topic label on line {} of '{}'",
                line_index + 1,
                path.display()
            );
        }
        candidates.push(candidate);
    }

    Ok(TopicCatalog::new(candidates))
}
