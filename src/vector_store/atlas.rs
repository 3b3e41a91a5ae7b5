//! MongoDB Atlas Vector Search adapter.

use super::{RetrievedChunk, SearchSettings, VectorStore, VectorStoreError};
use super::pipeline::{build_search_pipeline, document_to_chunk};
use crate::config::Config;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{Client, Collection, bson::Document};

/// Read-only client that runs `$vectorSearch` aggregations against one collection.
pub struct AtlasVectorStore {
    collection: Collection<Document>,
    settings: SearchSettings,
}

impl AtlasVectorStore {
    /// Connect using the MongoDB settings from `config`.
    ///
    /// The driver connects lazily; this only validates the connection string and resolves SRV
    /// records, so an unreachable cluster surfaces on the first search.
    pub async fn connect(config: &Config) -> Result<Self, VectorStoreError> {
        let client = Client::with_uri_str(&config.mongodb_uri)
            .await
            .map_err(|error| VectorStoreError::Connection(error.to_string()))?;
        let collection = client
            .database(&config.mongodb_db)
            .collection::<Document>(&config.mongodb_collection);

        tracing::debug!(
            database = %config.mongodb_db,
            collection = %config.mongodb_collection,
            index = %config.vector_index_name,
            "Initialized MongoDB Atlas vector store"
        );

        Ok(Self::from_collection(
            collection,
            SearchSettings {
                index_name: config.vector_index_name.clone(),
                text_key: config.vector_text_key.clone(),
                embedding_key: config.vector_embedding_key.clone(),
            },
        ))
    }

    /// Wrap an existing collection handle.
    pub fn from_collection(collection: Collection<Document>, settings: SearchSettings) -> Self {
        Self {
            collection,
            settings,
        }
    }
}

#[async_trait]
impl VectorStore for AtlasVectorStore {
    async fn similarity_search(
        &self,
        vector: Vec<f32>,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, VectorStoreError> {
        let pipeline = build_search_pipeline(&self.settings, &vector, k);
        let cursor = self.collection.aggregate(pipeline).await.map_err(|error| {
            tracing::error!(
                collection = %self.collection.name(),
                error = %error,
                "Vector search aggregation failed"
            );
            VectorStoreError::Query(error)
        })?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        tracing::debug!(
            collection = %self.collection.name(),
            requested = k,
            returned = documents.len(),
            "Vector search completed"
        );

        Ok(documents
            .into_iter()
            .map(|document| document_to_chunk(&self.settings, document))
            .collect())
    }
}
