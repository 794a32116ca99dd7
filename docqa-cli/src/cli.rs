//! Command-line flags and pipeline wiring for the `docqa` binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use docqa_rag::config::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_SOURCE_FOLDER,
};
use docqa_rag::ollama::{OllamaChatModel, OllamaEmbeddingProvider};
use docqa_rag::{RagConfig, RagPipeline};
use docqa_telemetry::{LogFormat, TelemetryConfig};

use crate::console::ConsoleOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Ask questions about the documents in a local folder.
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about)]
pub struct Cli {
    /// Folder containing the documents (not searched recursively)
    #[arg(long, env = "DOCQA_SOURCE", default_value = DEFAULT_SOURCE_FOLDER)]
    pub source: PathBuf,

    /// Ollama model used for embeddings
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Ollama model used to write answers
    #[arg(long, env = "DOCQA_GENERATION_MODEL", default_value = DEFAULT_GENERATION_MODEL)]
    pub generation_model: String,

    /// Ollama server address
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    /// Maximum chunk size in characters
    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = 800)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value_t = 150)]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, env = "DOCQA_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Print the retrieved chunks and their scores after each answer
    #[arg(long)]
    pub show_sources: bool,
}

impl Cli {
    /// Validated pipeline configuration from the flags.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .source_folder(&self.source)
            .embedding_model(&self.embedding_model)
            .generation_model(&self.generation_model)
            .ollama_url(normalize_url(&self.ollama_url))
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .build()
            .context("Invalid configuration")
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig::new("docqa").with_format(self.log_format.into())
    }

    pub fn console_options(&self) -> ConsoleOptions {
        ConsoleOptions { show_sources: self.show_sources }
    }
}

/// `OLLAMA_HOST` is often set without a scheme (`127.0.0.1:11434`).
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") { url.to_string() } else { format!("http://{url}") }
}

/// Build a pipeline backed by the Ollama server named in `config`.
pub fn build_pipeline(config: RagConfig) -> Result<RagPipeline> {
    let embedder = OllamaEmbeddingProvider::new(&config.ollama_url, &config.embedding_model)?;
    let chat = OllamaChatModel::new(&config.ollama_url, &config.generation_model)?;
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(embedder))
        .chat_model(Arc::new(chat))
        .config(config)
        .build()?;
    Ok(pipeline)
}
