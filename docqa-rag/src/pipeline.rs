//! Question-answering pipeline orchestrator.
//!
//! The [`RagPipeline`] ties together a [`FolderLoader`], a [`Chunker`], an
//! [`EmbeddingProvider`], and an [`AnswerGenerator`]. Everything runs
//! sequentially: one document, one chunk, one query at a time.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagPipeline, RagConfig, RecursiveChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .chat_model(Arc::new(chat))
//!     .build()?;
//!
//! let documents = pipeline.load_documents()?.documents;
//! let (kb, _report) = pipeline.build_knowledge_base(&documents).await?;
//! let answer = pipeline.answer(&kb, "What is the warranty period?").await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{AnswerGenerator, ChatModel};
use crate::index::{IndexReport, KnowledgeBase};
use crate::loader::{FolderLoader, LoadReport};

/// A generated answer with the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The model's reply, or the fallback text if generation failed.
    pub text: String,
    /// Retrieved chunks, most similar first.
    pub sources: Vec<SearchResult>,
}

/// The pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    loader: FolderLoader,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generator: AnswerGenerator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Load every document in the configured source folder.
    pub fn load_documents(&self) -> Result<LoadReport> {
        self.loader.load(&self.config.source_folder)
    }

    /// Split documents into chunks, in document order.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> =
            documents.iter().flat_map(|document| self.chunker.chunk(document)).collect();
        info!(documents = documents.len(), chunk_count = chunks.len(), "chunked documents");
        chunks
    }

    /// Chunk and embed `documents` into a searchable [`KnowledgeBase`].
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if the documents yield no chunks.
    /// - [`RagError::EmptyEmbeddingSet`] if no chunk could be embedded.
    pub async fn build_knowledge_base(
        &self,
        documents: &[Document],
    ) -> Result<(KnowledgeBase, IndexReport)> {
        let chunks = self.chunk_documents(documents);
        if chunks.is_empty() {
            error!(folder = %self.config.source_folder.display(), "no chunks to index");
            return Err(RagError::EmptyCorpus {
                source_folder: self.config.source_folder.clone(),
            });
        }
        KnowledgeBase::build(chunks, self.embedding_provider.as_ref()).await
    }

    /// Load, chunk, and embed the configured source folder.
    pub async fn index_source_folder(&self) -> Result<(KnowledgeBase, IndexReport)> {
        let report = self.load_documents()?;
        self.build_knowledge_base(&report.documents).await
    }

    /// Embed `query` and return the `top_k` most similar chunks.
    ///
    /// # Errors
    ///
    /// Returns the embedding error if the query cannot be embedded; no
    /// retrieval is possible without a query vector.
    pub async fn retrieve(&self, kb: &KnowledgeBase, query: &str) -> Result<Vec<SearchResult>> {
        let query_vector = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;
        let results = kb.search(&query_vector, self.config.top_k)?;
        info!(result_count = results.len(), "retrieved relevant chunks");
        Ok(results)
    }

    /// Retrieve context for `query` and generate an answer from it.
    ///
    /// Generation failures do not surface as errors; the answer text becomes
    /// [`GENERATION_FALLBACK_ANSWER`](crate::generation::GENERATION_FALLBACK_ANSWER).
    pub async fn answer(&self, kb: &KnowledgeBase, query: &str) -> Result<Answer> {
        let sources = self.retrieve(kb, query).await?;
        let context: Vec<&str> = sources.iter().map(|r| r.chunk.text.as_str()).collect();
        let text = self.generator.generate(query, &context).await;
        Ok(Answer { text, sources })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `chat_model` are required. The config defaults
/// to [`RagConfig::default()`], the loader to [`FolderLoader::new()`], and
/// the chunker to a [`RecursiveChunker`] sized from the config.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    loader: Option<FolderLoader>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chat_model: Option<Arc<dyn ChatModel>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document loader.
    pub fn loader(mut self, loader: FolderLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the chat model used for answer generation.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// config fails [`RagConfig::validate`].
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let chat_model = self
            .chat_model
            .ok_or_else(|| RagError::Config("chat_model is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });

        Ok(RagPipeline {
            loader: self.loader.unwrap_or_default(),
            chunker,
            embedding_provider,
            generator: AnswerGenerator::new(chat_model),
            config,
        })
    }
}
