//! Hugging Face Inference API adapter (`feature-extraction` pipeline).

use super::{EmbeddingClient, EmbeddingClientError, ensure_count, status_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Embedding client that calls the hosted Hugging Face feature-extraction pipeline.
pub struct HuggingFaceEmbeddingClient {
    http: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HuggingFaceEmbeddingClient {
    /// Construct a client for `model` served under `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        api_token: Option<String>,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder().user_agent("ragchat/0.1").build()?;
        let endpoint = format!(
            "{}/models/{}/pipeline/feature-extraction",
            base_url.trim_end_matches('/'),
            model.trim_matches('/')
        );
        if api_token.is_none() {
            tracing::warn!("No Hugging Face token configured; requests may be rate limited");
        }
        Ok(Self {
            http,
            endpoint,
            api_token,
        })
    }
}

/// Sentence-transformer models return one pooled vector per input; plain encoders return one
/// vector per token and are mean-pooled here.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Pooled(Vec<Vec<f32>>),
    TokenLevel(Vec<Vec<Vec<f32>>>),
}

impl FeatureExtractionResponse {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            Self::Pooled(vectors) => vectors,
            Self::TokenLevel(batches) => batches.into_iter().map(mean_pool).collect(),
        }
    }
}

fn mean_pool(tokens: Vec<Vec<f32>>) -> Vec<f32> {
    let Some(width) = tokens.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut pooled = vec![0.0_f32; width];
    for token in &tokens {
        for (slot, value) in pooled.iter_mut().zip(token) {
            *slot += value;
        }
    }
    let count = tokens.len() as f32;
    pooled.iter_mut().for_each(|value| *value /= count);
    pooled
}

#[async_trait]
impl EmbeddingClient for HuggingFaceEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let expected = texts.len();
        let mut request = self.http.post(&self.endpoint).json(&json!({ "inputs": texts }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let error = status_error(response).await;
            tracing::error!(error = %error, "Hugging Face embedding request failed");
            return Err(error);
        }

        let body: FeatureExtractionResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode feature-extraction response: {error}"
            ))
        })?;

        ensure_count(body.into_vectors(), expected)
    }
}
