//! Language model abstraction used for answer generation and question condensing.
//!
//! The only shipped adapter talks to Groq's OpenAI-compatible chat completions API; tests plug
//! in scripted implementations of [`LanguageModel`].

mod groq;

pub use groq::GroqClient;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum LanguageModelError {
    /// Provider could not be reached.
    #[error("Language model provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Language model returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider response could not be parsed or carried no answer.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Author of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// Instructions and retrieved context.
    System,
    /// End-user content.
    User,
}

/// Single message of a chat-style prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    /// Author of the message.
    pub role: PromptRole,
    /// Message body.
    pub content: String,
}

impl PromptMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }
}

/// Interface implemented by hosted chat models.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate the next assistant message for `messages`.
    async fn complete(&self, messages: Vec<PromptMessage>) -> Result<String, LanguageModelError>;

    /// Model identifier, used for logging.
    fn model_name(&self) -> &str;
}
