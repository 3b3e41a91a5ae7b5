//! Embedding client abstraction and HTTP adapters.

mod huggingface;
mod ollama;

pub use huggingface::HuggingFaceEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// HTTP layer failed before receiving a response.
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with a non-success status.
    #[error("Embedding provider returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider answered but the payload could not be interpreted.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build an embedding client suitable for the supplied configuration.
pub fn get_embedding_client(
    config: &Config,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        "Building embedding client"
    );
    let client: Box<dyn EmbeddingClient> = match config.embedding_provider {
        EmbeddingProvider::HuggingFace => Box::new(HuggingFaceEmbeddingClient::new(
            &config.huggingface_api_url,
            &config.embedding_model,
            config.huggingface_api_token.clone(),
        )?),
        EmbeddingProvider::Ollama => Box::new(OllamaEmbeddingClient::new(
            &config.ollama_url,
            &config.embedding_model,
        )?),
    };
    Ok(client)
}

/// Read the body of a failed response into an [`EmbeddingClientError::UnexpectedStatus`].
async fn status_error(response: reqwest::Response) -> EmbeddingClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    EmbeddingClientError::UnexpectedStatus { status, body }
}

/// Reject responses whose vector count does not line up with the request.
fn ensure_count(
    embeddings: Vec<Vec<f32>>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
    if embeddings.len() == expected {
        Ok(embeddings)
    } else {
        Err(EmbeddingClientError::InvalidResponse(format!(
            "expected {expected} vectors, got {}",
            embeddings.len()
        )))
    }
}
