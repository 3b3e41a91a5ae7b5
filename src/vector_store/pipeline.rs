//! Helpers for building `$vectorSearch` pipelines and mapping result documents.

use super::RetrievedChunk;
use mongodb::bson::{Bson, Document, doc};
use serde_json::{Map, Value};

/// Field the pipeline writes the similarity score into.
const SCORE_FIELD: &str = "score";

/// Candidate pool size relative to `k`; Atlas recommends at least 10x.
const CANDIDATE_MULTIPLIER: usize = 10;

/// Collection-level settings that shape a search.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Atlas vector index name.
    pub index_name: String,
    /// Field storing the chunk text.
    pub text_key: String,
    /// Field storing the embedding.
    pub embedding_key: String,
}

/// Build the aggregation pipeline for a top-`k` vector search.
pub fn build_search_pipeline(settings: &SearchSettings, vector: &[f32], k: usize) -> Vec<Document> {
    let query_vector: Vec<f64> = vector.iter().map(|value| f64::from(*value)).collect();
    let limit = i64::try_from(k).unwrap_or(i64::MAX);
    let candidates = i64::try_from(k.saturating_mul(CANDIDATE_MULTIPLIER)).unwrap_or(i64::MAX);

    vec![
        doc! {
            "$vectorSearch": {
                "index": settings.index_name.as_str(),
                "path": settings.embedding_key.as_str(),
                "queryVector": query_vector,
                "numCandidates": candidates,
                "limit": limit,
            }
        },
        doc! { "$set": { SCORE_FIELD: { "$meta": "vectorSearchScore" } } },
        doc! { "$project": { settings.embedding_key.as_str(): 0 } },
    ]
}

/// Convert a result document into a [`RetrievedChunk`].
///
/// Every field other than `_id`, the text key, the embedding key and the score becomes metadata.
pub fn document_to_chunk(settings: &SearchSettings, mut document: Document) -> RetrievedChunk {
    let text = match document.remove(&settings.text_key) {
        Some(Bson::String(text)) => text,
        Some(other) => {
            tracing::warn!(field = %settings.text_key, kind = ?other.element_type(), "Chunk text is not a string");
            String::new()
        }
        None => String::new(),
    };
    let score = document.remove(SCORE_FIELD).and_then(|value| match value {
        Bson::Double(score) => Some(score),
        Bson::Int32(score) => Some(f64::from(score)),
        _ => None,
    });
    document.remove("_id");
    document.remove(&settings.embedding_key);

    let metadata: Map<String, Value> = document
        .into_iter()
        .map(|(key, value)| (key, value.into_relaxed_extjson()))
        .collect();

    RetrievedChunk {
        text,
        metadata,
        score,
    }
}
