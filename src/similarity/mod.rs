//! Shared vector space and cosine ranking.
//!
//! Documents and candidate topics are vectorized together so both blocks use
//! the same vocabulary and IDF statistics, then compared cell by cell.

mod ranker;
mod vector_space;

pub use ranker::{SimilarityMatrix, similarity};
pub use vector_space::{JointVectors, TermVector, VectorSpace, tokenize};

/// Builds the joint space and the document × topic similarity matrix in one
/// step.
#[must_use]
pub fn rank<D: AsRef<str>, T: AsRef<str>>(documents: &[D], topics: &[T]) -> SimilarityMatrix {
    let joint = VectorSpace::fit_joint(documents, topics);
    similarity(&joint.documents, &joint.topics)
}
