//! Joint TF-IDF vector space over document and topic-candidate texts.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

/// Word tokens of two or more Unicode word characters.
#[allow(clippy::expect_used)]
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\w\w+\b").expect("token regex is valid") // Static pattern, safe to panic
});

/// Splits text into lowercase vocabulary tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A sparse, L2-normalized term-weight vector.
///
/// Entries are sorted by dimension index. An empty vector is the zero
/// vector (no vocabulary term in the source text).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    entries: Vec<(usize, f64)>,
}

impl TermVector {
    /// Builds a vector from `(index, weight)` pairs, dropping zero weights.
    #[must_use]
    pub fn from_entries(mut entries: Vec<(usize, f64)>) -> Self {
        entries.retain(|(_, weight)| *weight != 0.0);
        entries.sort_by_key(|(index, _)| *index);
        Self { entries }
    }

    /// Non-zero `(index, weight)` pairs in index order.
    #[must_use]
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// True for the zero vector.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Euclidean length.
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Sparse dot product (merge over sorted indices).
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        let (mut i, mut j, mut sum) = (0, 0, 0.0);
        while i < self.entries.len() && j < other.entries.len() {
            let (a_index, a_weight) = self.entries[i];
            let (b_index, b_weight) = other.entries[j];
            match a_index.cmp(&b_index) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_weight * b_weight;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn normalized(self) -> Self {
        let norm = self.norm();
        if norm == 0.0 {
            return Self::default();
        }
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|(index, weight)| (index, weight / norm))
                .collect(),
        }
    }
}

/// Vocabulary (term → dimension) plus smoothed IDF weights.
///
/// Built fresh for each batch; nothing carries over between runs.
#[derive(Debug, Clone, Default)]
pub struct VectorSpace {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

/// Document and topic vectors projected into one shared space.
#[derive(Debug, Clone)]
pub struct JointVectors {
    pub space: VectorSpace,
    /// One vector per document, in input order.
    pub documents: Vec<TermVector>,
    /// One vector per topic candidate, in input order.
    pub topics: Vec<TermVector>,
}

impl VectorSpace {
    /// Fits vocabulary and IDF statistics over `texts`.
    ///
    /// Dimensions follow sorted term order. IDF is smoothed:
    /// `ln((1 + n) / (1 + df)) + 1`.
    #[must_use]
    pub fn fit<S: AsRef<str>>(texts: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t.as_ref())).collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let terms: BTreeSet<&str> = document_frequency.keys().copied().collect();
        #[allow(clippy::cast_precision_loss)]
        let n = tokenized.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(terms.len());
        for (index, term) in terms.into_iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let df = document_frequency[term] as f64;
            idf.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term.to_string(), index);
        }

        Self { vocabulary, idf }
    }

    /// Fits one space over the union of both lists and splits the vectors
    /// back into a document block and a topic block.
    #[must_use]
    #[instrument(skip_all, fields(documents = documents.len(), topics = topics.len()))]
    pub fn fit_joint<D: AsRef<str>, T: AsRef<str>>(documents: &[D], topics: &[T]) -> JointVectors {
        let all: Vec<&str> = documents
            .iter()
            .map(AsRef::as_ref)
            .chain(topics.iter().map(AsRef::as_ref))
            .collect();
        let space = Self::fit(&all);
        debug!(dimension = space.dimension(), "Vector space fitted");

        let document_vectors = documents.iter().map(|d| space.transform(d.as_ref())).collect();
        let topic_vectors = topics.iter().map(|t| space.transform(t.as_ref())).collect();
        JointVectors {
            space,
            documents: document_vectors,
            topics: topic_vectors,
        }
    }

    /// Projects text into the space: raw term counts times IDF, L2-normalized.
    ///
    /// Terms outside the vocabulary are ignored; text without any known term
    /// yields the zero vector.
    #[must_use]
    pub fn transform(&self, text: &str) -> TermVector {
        let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_insert(0) += 1;
            }
        }
        let entries = counts
            .into_iter()
            .map(|(index, count)| (index, f64::from(count) * self.idf[index]))
            .collect();
        TermVector::from_entries(entries).normalized()
    }

    /// Number of vocabulary terms.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    /// Dimension index of `term`, if it is in the vocabulary.
    #[must_use]
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// IDF weight of `term`, if it is in the vocabulary.
    #[must_use]
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.index_of(term).map(|index| self.idf[index])
    }
}
