//! Ollama clients for embeddings and chat.
//!
//! Both clients call a local Ollama server over HTTP with `reqwest`.
//! Requests are made one at a time and wait without a timeout, so a stalled
//! server stalls the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{ChatMessage, ChatModel};

const PROVIDER: &str = "Ollama";

/// Field of the `/api/embed` response that holds the vectors.
const EMBEDDINGS_FIELD: &str = "embeddings";

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

fn validate(base_url: &str, model: &str) -> std::result::Result<(), String> {
    if base_url.trim().is_empty() {
        return Err("base URL must not be empty".to_string());
    }
    if model.trim().is_empty() {
        return Err("model must not be empty".to_string());
    }
    Ok(())
}

/// Pull the server's `error` message out of a non-2xx body, falling back to
/// the raw body.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body)
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Extract the first vector from an `/api/embed` response body.
///
/// The vectors are nested under `embeddings` as a list of lists, one per
/// input; a single input yields a single inner list.
///
/// # Errors
///
/// Returns [`RagError::MalformedEmbedding`] if the field is missing, is not
/// a list of number lists, or holds no non-empty vector.
pub fn parse_embed_response(body: &Value) -> Result<Vec<f32>> {
    let malformed = |message: String| RagError::MalformedEmbedding {
        provider: PROVIDER.to_string(),
        message,
    };

    let embeddings = body
        .get(EMBEDDINGS_FIELD)
        .ok_or_else(|| malformed(format!("response has no '{EMBEDDINGS_FIELD}' field: {body}")))?;
    let embeddings: Vec<Vec<f32>> = serde_json::from_value(embeddings.clone())
        .map_err(|e| malformed(format!("'{EMBEDDINGS_FIELD}' is not a list of vectors: {e}")))?;

    match embeddings.into_iter().next() {
        Some(vector) if !vector.is_empty() => Ok(vector),
        Some(_) => Err(malformed("first embedding is empty".to_string())),
        None => Err(malformed(format!("'{EMBEDDINGS_FIELD}' is empty"))),
    }
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("http://localhost:11434", "nomic-embed-text")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `model` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let model = model.into();
        validate(&base_url, &model).map_err(|message| RagError::Embedding {
            provider: PROVIDER.to_string(),
            message,
        })?;
        Ok(Self { client: reqwest::Client::new(), base_url, model })
    }

    /// The embedding model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let failed = |message: String| RagError::Embedding {
            provider: PROVIDER.to_string(),
            message,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "api/embed"))
            .json(&EmbedRequest { model: &self.model, input: text })
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embed request failed");
                failed(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "embed API error");
            return Err(failed(format!("API returned {status}: {}", error_detail(body))));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse embed response");
            RagError::MalformedEmbedding {
                provider: PROVIDER.to_string(),
                message: format!("response is not JSON: {e}"),
            }
        })?;

        parse_embed_response(&body)
    }
}

// ── Chat ───────────────────────────────────────────────────────────

/// A [`ChatModel`] backed by Ollama's non-streaming `/api/chat` endpoint.
pub struct OllamaChatModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaChatModel {
    /// Create a chat client for `model` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let model = model.into();
        validate(&base_url, &model).map_err(|message| RagError::Generation {
            model: model.clone(),
            message,
        })?;
        Ok(Self { client: reqwest::Client::new(), base_url, model })
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, messages = messages.len(), "chat request");

        let failed = |message: String| RagError::Generation { model: self.model.clone(), message };

        let response = self
            .client
            .post(endpoint(&self.base_url, "api/chat"))
            .json(&ChatRequest { model: &self.model, messages, stream: false })
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("API returned {status}: {}", error_detail(body))));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("failed to parse response: {e}")))?;
        Ok(chat.message.content)
    }
}
