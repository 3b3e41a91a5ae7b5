//! Result and error types for the chat pipeline.

use crate::{
    embedding::EmbeddingClientError, llm::LanguageModelError, memory::ChatTurn,
    vector_store::VectorStoreError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors emitted while answering a question. Memory is never modified when one is returned.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Embedding provider failed to vectorize the question.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the question")]
    EmptyEmbedding,
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured on the server.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
    /// Vector search failed.
    #[error("Vector search failed: {0}")]
    Retrieval(#[from] VectorStoreError),
    /// Language model failed while condensing the question or generating the answer.
    #[error("Answer generation failed: {0}")]
    Generation(#[from] LanguageModelError),
}

/// Document cited by an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReference {
    /// File name of the source document, path stripped.
    pub source: String,
}

/// Successful answer together with the session history after it was recorded.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Generated answer text.
    pub answer: String,
    /// One entry per retrieved chunk, in retrieval order.
    pub sources: Vec<SourceReference>,
    /// Full session history including this exchange.
    pub chat_history: Vec<ChatTurn>,
}
