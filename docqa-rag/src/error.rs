//! Error types for the `docqa-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, indexing, retrieving, or answering.
///
/// Per-item variants (`DocumentParse`, `UnsupportedDocument`, `Embedding`,
/// `MalformedEmbedding`) are recovered by the caller that owns the batch.
/// Corpus-level variants halt startup; see [`RagError::is_fatal`].
#[derive(Debug, Error)]
pub enum RagError {
    /// A single document could not be read or parsed.
    #[error("Failed to parse document {}: {message}", path.display())]
    DocumentParse {
        /// The file that failed.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// No parser is registered for the document's extension.
    #[error("Unsupported document type: {}", path.display())]
    UnsupportedDocument {
        /// The file that was skipped.
        path: PathBuf,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding provider answered, but without a usable vector.
    #[error("Malformed embedding response ({provider}): {message}")]
    MalformedEmbedding {
        /// The embedding provider that produced the response.
        provider: String,
        /// What was missing from the response.
        message: String,
    },

    /// A vector does not share the collection's dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the collection.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// Loading and splitting produced no chunks at all.
    #[error("No document chunks could be produced from {}", source_folder.display())]
    EmptyCorpus {
        /// The folder that was scanned.
        source_folder: PathBuf,
    },

    /// Every chunk failed to embed.
    #[error("Failed to embed any of the {chunk_count} chunks")]
    EmptyEmbeddingSet {
        /// How many chunks were attempted.
        chunk_count: usize,
    },

    /// The answer-generation call failed.
    #[error("Generation error ({model}): {message}")]
    Generation {
        /// The chat model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source folder itself could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether this error leaves nothing to search, so startup must halt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RagError::EmptyCorpus { .. }
                | RagError::EmptyEmbeddingSet { .. }
                | RagError::Config(_)
                | RagError::Io(_)
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
