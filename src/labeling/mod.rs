//! High-level labeling operations over corpora and topic tables.
//!
//! Each operation chains normalize → joint vector space → cosine ranking →
//! assigner and writes the resulting labels into a new column.
//!
//! - Summarization: normalized `Keywords` against a topic catalog, with a
//!   scarce-label [`AssignmentStrategy`]; output column `Summary topic`.
//! - Classification: cleaned `Title` against model-produced topics, nearest
//!   topic per document; output column `Assigned Topic`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::assign::{
    Assignment, AssignmentStrategy, NearestTopicAssigner, labels_of, unlabeled_count,
};
use crate::corpus::{
    ASSIGNED_TOPIC_COLUMN, Corpus, CorpusError, KEYWORDS_COLUMN, SUMMARY_TOPIC_COLUMN, Table,
};
use crate::similarity::rank;
use crate::topics::{TextNormalizer, TopicCandidate, TopicCatalog, clean_text};

/// Counts from one labeling pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelingReport {
    /// Column the labels were written to.
    pub column: String,
    pub documents: usize,
    pub labeled: usize,
    /// Documents that resolved to `Unlabeled`.
    pub unlabeled: usize,
}

impl LabelingReport {
    fn new(column: &str, assignments: &[Assignment]) -> Self {
        let unlabeled = unlabeled_count(assignments);
        Self {
            column: column.to_string(),
            documents: assignments.len(),
            labeled: assignments.len() - unlabeled,
            unlabeled,
        }
    }
}

/// Summarization over already-normalized texts.
#[must_use]
pub fn summarize_texts<S: AsRef<str>>(
    texts: &[S],
    catalog: &TopicCatalog,
    strategy: AssignmentStrategy,
) -> Vec<Assignment> {
    let matrix = rank(texts, &catalog.texts());
    strategy.assign(&matrix, &owned_labels(catalog))
}

/// Nearest-topic classification over already-cleaned texts.
#[must_use]
pub fn classify_texts<S: AsRef<str>>(texts: &[S], topics: &TopicCatalog) -> Vec<Assignment> {
    let matrix = rank(texts, &topics.texts());
    NearestTopicAssigner::new(owned_labels(topics)).assign(&matrix)
}

/// Adds a `Summary topic` column to the corpus from its `Keywords`.
///
/// # Errors
/// Returns `CorpusError::ColumnLength` only if the corpus changed size
/// underneath the pass.
#[instrument(skip_all, fields(documents = corpus.len(), strategy = %strategy))]
pub fn summarize_corpus(
    corpus: &mut Corpus,
    normalizer: &TextNormalizer,
    catalog: &TopicCatalog,
    strategy: AssignmentStrategy,
) -> Result<LabelingReport, CorpusError> {
    let keywords: Vec<&str> = corpus.documents().map(|doc| doc.keywords).collect();
    let normalized = normalizer.normalize_all(&keywords);
    let assignments = summarize_texts(&normalized, catalog, strategy);
    corpus.set_column(SUMMARY_TOPIC_COLUMN, labels_of(&assignments))?;
    Ok(finish(SUMMARY_TOPIC_COLUMN, &assignments))
}

/// Adds a `Summary topic` column to a model summary table from its
/// `Keywords` column.
///
/// # Errors
/// Returns `CorpusError::MissingColumn` if the table has no `Keywords`.
#[instrument(skip_all, fields(table = table_name, rows = table.len(), strategy = %strategy))]
pub fn summarize_table(
    table: &mut Table,
    table_name: &str,
    normalizer: &TextNormalizer,
    catalog: &TopicCatalog,
    strategy: AssignmentStrategy,
) -> Result<LabelingReport, CorpusError> {
    let index = table.require_column(table_name, KEYWORDS_COLUMN)?;
    let raw: Vec<&str> = table.column(index).collect();
    let normalized = normalizer.normalize_all(&raw);
    let assignments = summarize_texts(&normalized, catalog, strategy);
    table.set_column(SUMMARY_TOPIC_COLUMN, labels_of(&assignments))?;
    Ok(finish(SUMMARY_TOPIC_COLUMN, &assignments))
}

/// Adds an `Assigned Topic` column to the corpus by matching each title
/// against the topic texts.
///
/// Titles and topic texts are whitespace-cleaned, not keyword-normalized.
///
/// # Errors
/// Returns `CorpusError::ColumnLength` only if the corpus changed size
/// underneath the pass.
#[instrument(skip_all, fields(documents = corpus.len(), topics = topics.len()))]
pub fn classify_corpus(
    corpus: &mut Corpus,
    topics: &TopicCatalog,
) -> Result<LabelingReport, CorpusError> {
    let titles: Vec<String> = corpus.documents().map(|doc| clean_text(doc.title)).collect();
    let cleaned = TopicCatalog::new(
        topics
            .candidates()
            .iter()
            .map(|c| TopicCandidate::new(c.label.clone(), clean_text(&c.text)))
            .collect(),
    );
    let assignments = classify_texts(&titles, &cleaned);
    corpus.set_column(ASSIGNED_TOPIC_COLUMN, labels_of(&assignments))?;
    Ok(finish(ASSIGNED_TOPIC_COLUMN, &assignments))
}

fn finish(column: &str, assignments: &[Assignment]) -> LabelingReport {
    let report = LabelingReport::new(column, assignments);
    if report.unlabeled > 0 {
        debug!(unlabeled = report.unlabeled, "Documents without similarity signal");
    }
    info!(
        column,
        labeled = report.labeled,
        unlabeled = report.unlabeled,
        "Labels assigned"
    );
    report
}

fn owned_labels(catalog: &TopicCatalog) -> Vec<String> {
    catalog.candidates().iter().map(|c| c.label.clone()).collect()
}
