//! The searchable knowledge base: chunks paired with their embeddings.

use tracing::{debug, info, warn};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::ranker::VectorCollection;

/// Counts from a [`KnowledgeBase::build`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Chunks handed to the embedder.
    pub chunks_total: usize,
    /// Chunks that received a vector and were kept.
    pub chunks_indexed: usize,
    /// Chunks dropped because embedding failed or came back malformed.
    pub chunks_dropped: usize,
}

/// Chunks and their vectors, index-aligned.
///
/// Both sides only grow together through [`KnowledgeBase::insert`], so the
/// chunk at position `i` is always the one embedded as row `i`.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    vectors: VectorCollection,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed every chunk, one call at a time, keeping the ones that succeed.
    ///
    /// A chunk whose embedding fails, is malformed, or has a different
    /// dimensionality from the first accepted vector is logged and dropped
    /// along with its vector slot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyEmbeddingSet`] if `chunks` is non-empty and
    /// every embedding failed. An empty `chunks` yields an empty knowledge base;
    /// callers that need a corpus check for that before calling.
    pub async fn build(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
    ) -> Result<(Self, IndexReport)> {
        let chunks_total = chunks.len();
        info!(provider = provider.name(), chunk_count = chunks_total, "embedding chunks");

        let mut kb = Self::new();
        let mut chunks_dropped = 0;

        for (position, chunk) in chunks.into_iter().enumerate() {
            let outcome = match provider.embed(&chunk.text).await {
                Ok(vector) => kb.insert(chunk, vector),
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                warn!(chunk = position + 1, error = %e, "dropping chunk without embedding");
                chunks_dropped += 1;
            }
        }

        let report =
            IndexReport { chunks_total, chunks_indexed: kb.len(), chunks_dropped };

        if chunks_total > 0 && kb.is_empty() {
            return Err(RagError::EmptyEmbeddingSet { chunk_count: chunks_total });
        }

        info!(
            indexed = report.chunks_indexed,
            dropped = report.chunks_dropped,
            dimensions = kb.dimensions().unwrap_or(0),
            "knowledge base ready"
        );
        Ok((kb, report))
    }

    /// Add one chunk with its vector.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::MalformedEmbedding`] for an empty vector and
    /// [`RagError::DimensionMismatch`] if the vector does not fit the
    /// collection. Nothing is inserted on error.
    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        if vector.is_empty() {
            return Err(RagError::MalformedEmbedding {
                provider: "knowledge base".to_string(),
                message: format!("empty vector for chunk '{}'", chunk.id),
            });
        }
        self.vectors.push(vector)?;
        self.chunks.push(chunk);
        Ok(())
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether nothing has been indexed.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensionality, or `None` while empty.
    pub fn dimensions(&self) -> Option<usize> {
        self.vectors.dimensions()
    }

    /// The indexed chunks in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The vector collection aligned with [`chunks`](Self::chunks).
    pub fn vectors(&self) -> &VectorCollection {
        &self.vectors
    }

    /// Return the `top_k` chunks most similar to `query_vector`, best first.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let ranked = self.vectors.rank_scored(query_vector, top_k)?;
        debug!(candidates = self.len(), returned = ranked.len(), "ranked chunks");
        Ok(ranked
            .into_iter()
            .map(|(index, score)| SearchResult { chunk: self.chunks[index].clone(), score })
            .collect())
    }
}
