//! Brute-force cosine similarity ranking over an in-memory vector collection.
//!
//! Every query scores every row (`O(n·d)`) and sorts the scores
//! (`O(n log n)`), which is fine for a few thousand chunks. An approximate
//! nearest-neighbour index would slot in behind [`VectorCollection::rank`].

use std::cmp::Ordering;

use crate::error::{RagError, Result};

/// Compute cosine similarity between two vectors.
///
/// Returns `None` when the similarity is undefined: the vectors differ in
/// length, either is empty, either has zero magnitude, or the result is not
/// finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let similarity = dot / (norm_a * norm_b);
    similarity.is_finite().then_some(similarity)
}

/// Ordered rows of equal-length vectors.
///
/// The dimensionality is fixed by the first row pushed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorCollection {
    rows: Vec<Vec<f32>>,
    dimensions: Option<usize>,
}

impl VectorCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from rows, rejecting any row whose length differs
    /// from the first.
    pub fn from_rows(rows: impl IntoIterator<Item = Vec<f32>>) -> Result<Self> {
        let mut collection = Self::new();
        for row in rows {
            collection.push(row)?;
        }
        Ok(collection)
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the row's length differs
    /// from the collection's dimensionality.
    pub fn push(&mut self, row: Vec<f32>) -> Result<()> {
        self.check_dimensions(row.len())?;
        self.dimensions.get_or_insert(row.len());
        self.rows.push(row);
        Ok(())
    }

    /// Whether a row of this length would be accepted by [`push`](Self::push).
    pub fn check_dimensions(&self, len: usize) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != len => {
                Err(RagError::DimensionMismatch { expected, actual: len })
            }
            _ => Ok(()),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the collection has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dimensionality of the rows, or `None` while empty.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// The row at `index`.
    pub fn get(&self, index: usize) -> Option<&[f32]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Return the indices of the `k` rows most similar to `query`, best first.
    ///
    /// See [`rank_scored`](Self::rank_scored) for the ordering rules.
    pub fn rank(&self, query: &[f32], k: usize) -> Result<Vec<usize>> {
        Ok(self.rank_scored(query, k)?.into_iter().map(|(index, _)| index).collect())
    }

    /// Return `(index, score)` for the `min(k, len)` rows most similar to
    /// `query`, ordered by descending score.
    ///
    /// Rows whose similarity is undefined (zero magnitude on either side)
    /// score [`f32::NEG_INFINITY`] and rank after every defined score. Equal
    /// scores keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the collection is non-empty
    /// and `query` has a different length.
    pub fn rank_scored(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 || self.rows.is_empty() {
            return Ok(Vec::new());
        }
        self.check_dimensions(query.len())?;

        let mut scored: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                (index, cosine_similarity(row, query).unwrap_or(f32::NEG_INFINITY))
            })
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
