//! Resolving one label per document from a similarity matrix.
//!
//! Three assigners share the [`Assignment`] result type:
//! - [`GreedyUniqueAssigner`]: document-order greedy pass, each label handed
//!   out at most once per run (summarization mode).
//! - [`OptimalMatchingAssigner`]: maximum-weight one-to-one matching, the
//!   opt-in alternative to the greedy pass.
//! - [`NearestTopicAssigner`]: per-document arg-max, labels repeat freely
//!   (classification mode).
//!
//! An all-zero similarity row carries no signal and resolves to
//! [`UNLABELED`] under every assigner.

mod greedy;
mod nearest;
mod optimal;

pub use greedy::{ConsumedLabels, GreedyUniqueAssigner};
pub use nearest::NearestTopicAssigner;
pub use optimal::OptimalMatchingAssigner;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::similarity::SimilarityMatrix;

/// Sentinel label for documents that received no topic.
pub const UNLABELED: &str = "Unlabeled";

/// Which assigner produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    GreedyUnique,
    NearestTopic,
    OptimalMatching,
}

impl Provenance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GreedyUnique => "greedy_unique",
            Self::NearestTopic => "nearest_topic",
            Self::OptimalMatching => "optimal_matching",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The label chosen for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// Chosen label, or [`UNLABELED`].
    pub label: String,
    /// Candidate column the label came from; `None` when unlabeled.
    pub candidate: Option<usize>,
    /// Similarity of the chosen pair (0 when unlabeled).
    pub similarity: f64,
    pub provenance: Provenance,
}

impl Assignment {
    pub(crate) fn matched(
        label: &str,
        candidate: usize,
        similarity: f64,
        provenance: Provenance,
    ) -> Self {
        Self {
            label: label.to_string(),
            candidate: Some(candidate),
            similarity,
            provenance,
        }
    }

    pub(crate) fn unlabeled(provenance: Provenance) -> Self {
        Self {
            label: UNLABELED.to_string(),
            candidate: None,
            similarity: 0.0,
            provenance,
        }
    }

    /// True when a candidate was chosen.
    #[must_use]
    pub fn is_labeled(&self) -> bool {
        self.candidate.is_some()
    }
}

/// Extracts the label column from a batch of assignments.
#[must_use]
pub fn labels_of(assignments: &[Assignment]) -> Vec<String> {
    assignments.iter().map(|a| a.label.clone()).collect()
}

/// Number of assignments that resolved to [`UNLABELED`].
#[must_use]
pub fn unlabeled_count(assignments: &[Assignment]) -> usize {
    assignments.iter().filter(|a| !a.is_labeled()).count()
}

/// Summarization policy: how scarce labels are distributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStrategy {
    /// Document-order greedy pass (order-dependent approximation).
    #[default]
    Greedy,
    /// Maximum-weight bipartite matching.
    Optimal,
}

impl AssignmentStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Optimal => "optimal",
        }
    }

    /// Runs the strategy over a matrix whose columns are `labels`.
    #[must_use]
    pub fn assign(self, matrix: &SimilarityMatrix, labels: &[String]) -> Vec<Assignment> {
        match self {
            Self::Greedy => GreedyUniqueAssigner::new(labels.to_vec()).assign(matrix),
            Self::Optimal => OptimalMatchingAssigner::new(labels.to_vec()).assign(matrix),
        }
    }
}

impl fmt::Display for AssignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssignmentStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "optimal" => Ok(Self::Optimal),
            other => Err(format!(
                "unknown assignment strategy '{other}' (expected 'greedy' or 'optimal')"
            )),
        }
    }
}
