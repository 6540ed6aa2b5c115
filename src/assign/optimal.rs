//! Maximum-weight one-to-one matching (Hungarian algorithm).

use std::collections::HashSet;

use tracing::{debug, instrument};

use super::{Assignment, Provenance};
use crate::similarity::SimilarityMatrix;

/// Summarization assigner that maximizes total similarity.
///
/// Matches documents with signal against distinct labels (the first column
/// carrying each label). Unlike the greedy pass the result does not depend
/// on document order. Documents left over when there are more documents
/// than labels get `Unlabeled`.
#[derive(Debug, Clone)]
pub struct OptimalMatchingAssigner {
    labels: Vec<String>,
}

impl OptimalMatchingAssigner {
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Solves the matching for every row of `matrix`.
    #[must_use]
    #[instrument(skip_all, fields(documents = matrix.rows(), candidates = self.labels.len()))]
    pub fn assign(&self, matrix: &SimilarityMatrix) -> Vec<Assignment> {
        let width = matrix.cols().min(self.labels.len());
        let mut seen = HashSet::new();
        let columns: Vec<usize> = (0..width)
            .filter(|&col| seen.insert(self.labels[col].as_str()))
            .collect();
        let rows: Vec<usize> = (0..matrix.rows())
            .filter(|&row| !matrix.is_zero_row(row))
            .collect();
        debug!(
            signal_rows = rows.len(),
            distinct_labels = columns.len(),
            "Solving assignment"
        );

        let mut result = vec![Assignment::unlabeled(Provenance::OptimalMatching); matrix.rows()];
        if rows.is_empty() || columns.is_empty() {
            return result;
        }

        let weights: Vec<Vec<f64>> = rows
            .iter()
            .map(|&row| columns.iter().map(|&col| matrix.row(row)[col]).collect())
            .collect();
        for (local_row, local_col) in max_weight_matching(&weights).into_iter().enumerate() {
            let Some(local_col) = local_col else { continue };
            let (row, col) = (rows[local_row], columns[local_col]);
            result[row] = Assignment::matched(
                &self.labels[col],
                col,
                matrix.row(row)[col],
                Provenance::OptimalMatching,
            );
        }
        result
    }
}

/// Returns, for each row, the column it is matched to.
///
/// Every row is matched when there are at least as many columns as rows;
/// otherwise every column is matched and the surplus rows get `None`.
fn max_weight_matching(weights: &[Vec<f64>]) -> Vec<Option<usize>> {
    let rows = weights.len();
    let cols = weights.first().map_or(0, Vec::len);
    if rows <= cols {
        let cost: Vec<Vec<f64>> = weights
            .iter()
            .map(|row| row.iter().map(|w| -w).collect())
            .collect();
        return hungarian(&cost, rows, cols);
    }

    let cost: Vec<Vec<f64>> = (0..cols)
        .map(|col| weights.iter().map(|row| -row[col]).collect())
        .collect();
    let mut by_row = vec![None; rows];
    for (col, row) in hungarian(&cost, cols, rows).into_iter().enumerate() {
        if let Some(row) = row {
            by_row[row] = Some(col);
        }
    }
    by_row
}

/// Minimum-cost assignment of `n` rows to `m >= n` columns.
///
/// Potentials-based Hungarian method, `O(n² m)`; indices are 1-based
/// internally with slot 0 as the virtual start column.
fn hungarian(cost: &[Vec<f64>], n: usize, m: usize) -> Vec<Option<usize>> {
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; m + 1];
    let mut owner = vec![0_usize; m + 1];
    let mut way = vec![0_usize; m + 1];

    for i in 1..=n {
        owner[0] = i;
        let mut j0 = 0;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let slack = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }
            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut matched = vec![None; n];
    for j in 1..=m {
        if owner[j] != 0 {
            matched[owner[j] - 1] = Some(j - 1);
        }
    }
    matched
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assign::{GreedyUniqueAssigner, UNLABELED};

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn total(assignments: &[Assignment]) -> f64 {
        assignments.iter().map(|a| a.similarity).sum()
    }

    #[test]
    fn test_beats_greedy_where_order_matters() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.9, 0.8], vec![0.95, 0.1]]);
        let names = labels(&["a", "b"]);

        let greedy = GreedyUniqueAssigner::new(names.clone()).assign(&matrix);
        let optimal = OptimalMatchingAssigner::new(names).assign(&matrix);

        assert_eq!(optimal[0].label, "b");
        assert_eq!(optimal[1].label, "a");
        assert!(total(&optimal) > total(&greedy));
    }

    #[test]
    fn test_surplus_documents_are_unlabeled() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.2], vec![0.9], vec![0.5]]);
        let result = OptimalMatchingAssigner::new(labels(&["a"])).assign(&matrix);
        let chosen: Vec<_> = result.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(chosen, [UNLABELED, "a", UNLABELED]);
    }

    #[test]
    fn test_zero_rows_never_consume_labels() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.0, 0.0], vec![0.1, 0.6]]);
        let result = OptimalMatchingAssigner::new(labels(&["a", "b"])).assign(&matrix);
        assert_eq!(result[0].label, UNLABELED);
        assert_eq!(result[1].label, "b");
    }

    #[test]
    fn test_labels_are_unique() {
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![0.5, 0.4, 0.3, 0.1],
            vec![0.6, 0.1, 0.2, 0.3],
            vec![0.7, 0.2, 0.1, 0.2],
        ]);
        let result = OptimalMatchingAssigner::new(labels(&["a", "b", "c", "d"])).assign(&matrix);
        let unique: HashSet<_> = result.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(unique.len(), 3);
        assert!((total(&result) - 1.4).abs() < 1e-9, "got {}", total(&result));
    }

    #[test]
    fn test_duplicate_label_columns_count_once() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.9, 0.8], vec![0.9, 0.8]]);
        let result = OptimalMatchingAssigner::new(labels(&["a", "a"])).assign(&matrix);
        assert_eq!(result.iter().filter(|a| a.is_labeled()).count(), 1);
    }

    #[test]
    fn test_max_weight_matching_square() {
        let weights = vec![vec![1.0, 2.0], vec![3.0, 1.0]];
        assert_eq!(max_weight_matching(&weights), [Some(1), Some(0)]);
    }
}
