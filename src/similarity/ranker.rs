//! Cosine-similarity ranking of documents against topic candidates.

use tracing::instrument;

use super::vector_space::TermVector;

/// Dense row-major matrix: rows are documents, columns are candidates.
///
/// Every cell lies in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Builds a matrix from explicit rows.
    ///
    /// The column count is the longest row; shorter rows are zero-padded.
    /// Values are clamped into `[0, 1]` and NaN becomes 0.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut values = Vec::with_capacity(rows.len() * cols);
        for row in &rows {
            values.extend(row.iter().map(|value| clamp_unit(*value)));
            values.extend(std::iter::repeat_n(0.0, cols - row.len()));
        }
        Self {
            rows: rows.len(),
            cols,
            values,
        }
    }

    /// Number of documents.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of candidates.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Similarity row for one document.
    ///
    /// # Panics
    /// Panics if `row` is out of bounds.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    /// Single cell, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.values[row * self.cols + col])
    }

    /// True when the document has no similarity to any candidate.
    #[must_use]
    pub fn is_zero_row(&self, row: usize) -> bool {
        self.row(row).iter().all(|value| *value == 0.0)
    }

    /// Iterates rows in document order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |row| self.row(row))
    }
}

/// Cosine similarity of every document vector against every topic vector.
///
/// A zero document vector yields an all-zero row.
#[must_use]
#[instrument(skip_all, fields(documents = documents.len(), topics = topics.len()))]
pub fn similarity(documents: &[TermVector], topics: &[TermVector]) -> SimilarityMatrix {
    let topic_norms: Vec<f64> = topics.iter().map(TermVector::norm).collect();
    let mut values = Vec::with_capacity(documents.len() * topics.len());
    for document in documents {
        let document_norm = document.norm();
        for (topic, topic_norm) in topics.iter().zip(&topic_norms) {
            let denominator = document_norm * topic_norm;
            let cosine = if denominator == 0.0 {
                0.0
            } else {
                document.dot(topic) / denominator
            };
            values.push(clamp_unit(cosine));
        }
    }
    SimilarityMatrix {
        rows: documents.len(),
        cols: topics.len(),
        values,
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
