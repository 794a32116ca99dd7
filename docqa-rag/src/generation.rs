//! Answer generation from retrieved context.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::Result;

/// The phrase the model is told to answer with when the context does not
/// contain the answer.
pub const NOT_IN_CONTEXT_ANSWER: &str =
    "I could not find the answer in the provided documents.";

/// Shown to the user when the chat model call itself fails.
pub const GENERATION_FALLBACK_ANSWER: &str =
    "Failed to generate an answer from the local model.";

/// Separator placed between context chunks in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The end user's turn.
    User,
}

/// One message in a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model identifier, used in logs and errors.
    fn name(&self) -> &str;

    /// Send the messages and return the reply text.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Turns a question plus retrieved chunks into a grounded answer.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    /// Create a generator backed by `model`.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Build the system + user prompt pair for `query` over `context_chunks`.
    pub fn build_messages(query: &str, context_chunks: &[&str]) -> Vec<ChatMessage> {
        let context = context_chunks.join(CONTEXT_SEPARATOR);
        let system = format!(
            "You are an AI assistant that answers questions using only the provided context. \
             If the answer is not in the context, say '{NOT_IN_CONTEXT_ANSWER}'"
        );
        let user = format!("Context:\n{context}\n\nQuestion: {query}\n\nAnswer:");
        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    /// Generate an answer, returning the model error on failure.
    pub async fn try_generate(&self, query: &str, context_chunks: &[&str]) -> Result<String> {
        info!(
            model = self.model.name(),
            context_chunks = context_chunks.len(),
            "generating answer"
        );
        let messages = Self::build_messages(query, context_chunks);
        self.model.chat(&messages).await
    }

    /// Generate an answer. A failed model call is logged and replaced with
    /// [`GENERATION_FALLBACK_ANSWER`].
    pub async fn generate(&self, query: &str, context_chunks: &[&str]) -> String {
        match self.try_generate(query, context_chunks).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(model = self.model.name(), error = %e, "answer generation failed");
                GENERATION_FALLBACK_ANSWER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_joins_context_and_names_fallback_phrase() {
        let messages = AnswerGenerator::build_messages("What?", &["first", "second"]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains(NOT_IN_CONTEXT_ANSWER));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Context:\nfirst\n\nsecond\n\nQuestion: What?\n\nAnswer:"
        );
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "hi"}));
    }
}
