//! Topic Labeling Core Library
//!
//! This library labels bibliographic records (title, abstract, keywords)
//! with topical categories. Keyword fields are normalized, documents and
//! candidate topics are embedded in one TF-IDF space, and labels are chosen
//! by cosine similarity. An external topic model discovers topics for a
//! corpus; its summary table is labeled against a fixed catalog and the
//! documents are then classified against the labeled topics.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`corpus`] - CSV, TSV and xlsx tables, documents and required-column checks
//! - [`topics`] - Keyword normalization and topic catalogs
//! - [`similarity`] - Joint TF-IDF vector space and cosine ranking
//! - [`assign`] - Greedy, nearest and optimal label assignment
//! - [`labeling`] - Summarization and classification over corpora
//! - [`model`] - External topic-model processes
//! - [`pipeline`] - Run orchestration, layout and manifests

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assign;
pub mod corpus;
pub mod labeling;
pub mod model;
pub mod pipeline;
pub mod similarity;
pub mod topics;

// Re-export commonly used types
pub use assign::{Assignment, AssignmentStrategy, Provenance, UNLABELED};
pub use corpus::{Corpus, CorpusError, Document, Table, TableFormat};
pub use labeling::{
    LabelingReport, classify_corpus, classify_texts, summarize_corpus, summarize_table,
    summarize_texts,
};
pub use model::{
    DEFAULT_INTERPRETER, DEFAULT_PROCESS_TIMEOUT, ModelError, ScriptModelRunner, TopicModelRunner,
};
pub use pipeline::{
    FailureKind, PipelineConfig, PipelineError, PipelineOrchestrator, RunFailure, RunManifest,
    RunReport, RunState,
};
pub use similarity::{SimilarityMatrix, VectorSpace, rank};
pub use topics::{NormalizerTables, TextNormalizer, TopicCandidate, TopicCatalog, load_catalog};
