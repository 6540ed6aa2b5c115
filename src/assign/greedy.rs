//! Document-order greedy assignment with per-run label scarcity.

use std::collections::HashSet;

use tracing::{debug, instrument};

use super::{Assignment, Provenance};
use crate::similarity::SimilarityMatrix;

/// Labels already handed out during one run.
///
/// Owned by a single [`GreedyUniqueAssigner`]; a new run starts from an
/// empty set.
#[derive(Debug, Clone, Default)]
pub struct ConsumedLabels {
    labels: HashSet<String>,
}

impl ConsumedLabels {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `label` consumed. Returns false if it already was.
    pub fn try_consume(&mut self, label: &str) -> bool {
        if self.labels.contains(label) {
            return false;
        }
        self.labels.insert(label.to_string())
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Greedy summarization assigner.
///
/// Documents are processed in row order. Each takes its most similar
/// candidate whose label no earlier document has taken; once every label is
/// consumed the remaining documents get `Unlabeled`. The result depends on
/// document order and is an approximation of an optimal matching, not a
/// replacement for one (see [`super::OptimalMatchingAssigner`]).
#[derive(Debug, Clone)]
pub struct GreedyUniqueAssigner {
    labels: Vec<String>,
    consumed: ConsumedLabels,
}

impl GreedyUniqueAssigner {
    /// Creates an assigner for candidates in column order.
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            consumed: ConsumedLabels::new(),
        }
    }

    /// Labels consumed so far in this run.
    #[must_use]
    pub fn consumed(&self) -> &ConsumedLabels {
        &self.consumed
    }

    /// Assigns every row of `matrix` in order.
    #[instrument(skip_all, fields(documents = matrix.rows(), candidates = self.labels.len()))]
    pub fn assign(&mut self, matrix: &SimilarityMatrix) -> Vec<Assignment> {
        (0..matrix.rows())
            .map(|row| {
                if matrix.is_zero_row(row) {
                    debug!(row, "No similarity signal, leaving unlabeled");
                    return Assignment::unlabeled(Provenance::GreedyUnique);
                }
                self.assign_row(matrix.row(row))
            })
            .collect()
    }

    /// Picks the best unconsumed candidate for one similarity row.
    ///
    /// Candidates are walked by descending similarity; equal scores keep
    /// column order, so the lower index wins.
    pub fn assign_row(&mut self, row: &[f64]) -> Assignment {
        let width = row.len().min(self.labels.len());
        let mut order: Vec<usize> = (0..width).collect();
        order.sort_by(|&a, &b| row[b].total_cmp(&row[a]));

        for candidate in order {
            let label = &self.labels[candidate];
            if self.consumed.try_consume(label) {
                return Assignment::matched(label, candidate, row[candidate], Provenance::GreedyUnique);
            }
        }
        Assignment::unlabeled(Provenance::GreedyUnique)
    }
}
