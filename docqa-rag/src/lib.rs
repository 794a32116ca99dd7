//! # docqa-rag
//!
//! Retrieval-augmented question answering over a folder of local documents.
//!
//! ## Overview
//!
//! - [`FolderLoader`] reads PDF and text files from one folder
//! - [`RecursiveChunker`] splits them into overlapping chunks
//! - [`EmbeddingProvider`] turns chunks and queries into vectors
//! - [`KnowledgeBase`] keeps each chunk paired with its vector
//! - [`VectorCollection::rank`] picks the top-k chunks by cosine similarity
//! - [`AnswerGenerator`] asks a [`ChatModel`] to answer from those chunks only
//! - [`RagPipeline`] wires the above together
//!
//! The [`ollama`] module provides embedding and chat clients for a local
//! Ollama server.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{RagConfig, RagPipeline};
//! use docqa_rag::ollama::{OllamaChatModel, OllamaEmbeddingProvider};
//!
//! let config = RagConfig::builder().source_folder("docs/").build()?;
//! let embedder = OllamaEmbeddingProvider::new(&config.ollama_url, &config.embedding_model)?;
//! let chat = OllamaChatModel::new(&config.ollama_url, &config.generation_model)?;
//! let pipeline = RagPipeline::builder()
//!     .embedding_provider(Arc::new(embedder))
//!     .chat_model(Arc::new(chat))
//!     .config(config)
//!     .build()?;
//!
//! let (kb, _) = pipeline.index_source_folder().await?;
//! let answer = pipeline.answer(&kb, "What does chapter 2 cover?").await?;
//! println!("{}", answer.text);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod loader;
pub mod ollama;
pub mod pipeline;
pub mod ranker;

pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{
    AnswerGenerator, ChatMessage, ChatModel, GENERATION_FALLBACK_ANSWER, NOT_IN_CONTEXT_ANSWER,
    Role,
};
pub use index::{IndexReport, KnowledgeBase};
pub use loader::{DocumentParser, FolderLoader, LoadFailure, LoadReport, PdfParser, PlainTextParser};
pub use pipeline::{Answer, RagPipeline, RagPipelineBuilder};
pub use ranker::{VectorCollection, cosine_similarity};
