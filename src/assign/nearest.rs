//! Nearest-topic classification: independent arg-max per document.

use tracing::instrument;

use super::{Assignment, Provenance};
use crate::similarity::SimilarityMatrix;

/// Classification assigner with no scarcity constraint.
///
/// Each document takes the candidate with the highest similarity; ties go to
/// the lowest candidate index. The result is a pure function of the matrix.
#[derive(Debug, Clone)]
pub struct NearestTopicAssigner {
    labels: Vec<String>,
}

impl NearestTopicAssigner {
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Assigns every row of `matrix`.
    #[must_use]
    #[instrument(skip_all, fields(documents = matrix.rows(), candidates = self.labels.len()))]
    pub fn assign(&self, matrix: &SimilarityMatrix) -> Vec<Assignment> {
        matrix.iter_rows().map(|row| self.assign_row(row)).collect()
    }

    /// Arg-max over one row. An all-zero row is unlabeled.
    #[must_use]
    pub fn assign_row(&self, row: &[f64]) -> Assignment {
        let width = row.len().min(self.labels.len());
        let mut best: Option<(usize, f64)> = None;
        for (candidate, &value) in row[..width].iter().enumerate() {
            if best.is_none_or(|(_, best_value)| value > best_value) {
                best = Some((candidate, value));
            }
        }
        match best {
            Some((candidate, value)) if value > 0.0 => Assignment::matched(
                &self.labels[candidate],
                candidate,
                value,
                Provenance::NearestTopic,
            ),
            _ => Assignment::unlabeled(Provenance::NearestTopic),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assign::UNLABELED;

    fn assigner(names: &[&str]) -> NearestTopicAssigner {
        NearestTopicAssigner::new(names.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_labels_repeat_across_documents() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.1, 0.7], vec![0.2, 0.9], vec![0.6, 0.3]]);
        let result = assigner(&["a", "b"]).assign(&matrix);
        let chosen: Vec<_> = result.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(chosen, ["b", "b", "a"]);
        assert!(result.iter().all(|a| a.provenance == Provenance::NearestTopic));
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.2, 0.5, 0.5]]);
        let result = assigner(&["a", "b", "c"]).assign(&matrix);
        assert_eq!(result[0].label, "b");
        assert_eq!(result[0].candidate, Some(1));
    }

    #[test]
    fn test_zero_row_is_unlabeled() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.0, 0.0]]);
        let result = assigner(&["a", "b"]).assign(&matrix);
        assert_eq!(result[0].label, UNLABELED);
        assert_eq!(result[0].candidate, None);
    }

    #[test]
    fn test_identical_matrices_give_identical_results() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.3, 0.3], vec![0.0, 0.4]]);
        let classifier = assigner(&["a", "b"]);
        assert_eq!(classifier.assign(&matrix), classifier.assign(&matrix.clone()));
    }

    #[test]
    fn test_empty_candidate_set_is_unlabeled() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![]]);
        let result = assigner(&[]).assign(&matrix);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].label, UNLABELED);
    }
}
