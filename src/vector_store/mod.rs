//! Vector store abstraction and the MongoDB Atlas adapter.

mod atlas;
mod pipeline;

pub use atlas::AtlasVectorStore;
pub use pipeline::{SearchSettings, build_search_pipeline, document_to_chunk};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while querying the vector store.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Connection string could not be parsed or the client could not be built.
    #[error("Invalid MongoDB connection settings: {0}")]
    Connection(String),
    /// The `$vectorSearch` aggregation failed.
    #[error("Vector search failed: {0}")]
    Query(#[from] mongodb::error::Error),
}

/// Document chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// Chunk text passed to the language model as context.
    pub text: String,
    /// Remaining document fields, e.g. `source` and `page`.
    pub metadata: Map<String, Value>,
    /// Similarity score reported by the store, when available.
    pub score: Option<f64>,
}

impl RetrievedChunk {
    /// Build a chunk with no score.
    pub fn new(text: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            text: text.into(),
            metadata,
            score: None,
        }
    }
}

/// Interface implemented by nearest-neighbour retrieval backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `k` chunks most similar to `vector`, best match first.
    async fn similarity_search(
        &self,
        vector: Vec<f32>,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, VectorStoreError>;
}
