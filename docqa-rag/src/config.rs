//! Configuration for the question-answering pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default folder scanned for documents.
pub const DEFAULT_SOURCE_FOLDER: &str = "sample_data/source/";

/// Default Ollama embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Default Ollama chat model.
pub const DEFAULT_GENERATION_MODEL: &str = "phi3:mini";

/// Default address of a local Ollama server.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Configuration parameters for the pipeline.
///
/// Built once at startup and passed by reference to the components that need
/// it; nothing reads configuration from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Folder whose files are loaded (non-recursively).
    pub source_folder: PathBuf,
    /// Model identifier sent with every embedding request.
    pub embedding_model: String,
    /// Model identifier sent with every chat request.
    pub generation_model: String,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::from(DEFAULT_SOURCE_FOLDER),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            chunk_size: 800,
            chunk_overlap: 150,
            top_k: 5,
        }
    }
}

impl RagConfig {
    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - a model identifier or the Ollama URL is blank
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        for (field, value) in [
            ("embedding_model", &self.embedding_model),
            ("generation_model", &self.generation_model),
            ("ollama_url", &self.ollama_url),
        ] {
            if value.trim().is_empty() {
                return Err(RagError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the folder documents are loaded from.
    pub fn source_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.config.source_folder = folder.into();
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the generation model identifier.
    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    /// Set the Ollama base URL.
    pub fn ollama_url(mut self, url: impl Into<String>) -> Self {
        self.config.ollama_url = url.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Build the [`RagConfig`], checking it with [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
