//! Chat service coordinating condensing, retrieval, generation and memory.

use crate::{
    chat::{
        prompt::{answer_messages, condense_messages, source_name},
        types::{ChatError, ChatOutcome, SourceReference},
    },
    config::Config,
    embedding::{EmbeddingClient, get_embedding_client},
    llm::{GroqClient, LanguageModel},
    memory::{ChatTurn, SessionStore},
    vector_store::{AtlasVectorStore, VectorStore},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Abstraction over the chat pipeline used by the HTTP surface.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Answer `query` within `session_id`, recording the exchange on success.
    async fn chat(&self, session_id: &str, query: &str) -> Result<ChatOutcome, ChatError>;

    /// Forget the history of `session_id`.
    async fn reset_memory(&self, session_id: &str);
}

/// Retrieval knobs applied to every question.
#[derive(Debug, Clone, Copy)]
pub struct ChatSettings {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Expected embedding length, checked when set.
    pub embedding_dimension: Option<usize>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            embedding_dimension: None,
        }
    }
}

/// Runs the conversational retrieval pipeline.
///
/// Follow-up questions are first rewritten into standalone questions using the session
/// history, then embedded, matched against the vector store and answered by the language
/// model. The exchange is recorded only after the answer is in hand, so a failing provider
/// leaves memory untouched.
pub struct ChatService {
    embedding_client: Arc<dyn EmbeddingClient>,
    vector_store: Arc<dyn VectorStore>,
    language_model: Arc<dyn LanguageModel>,
    sessions: Arc<SessionStore>,
    settings: ChatSettings,
}

impl ChatService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
        language_model: Arc<dyn LanguageModel>,
        sessions: Arc<SessionStore>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            embedding_client,
            vector_store,
            language_model,
            sessions,
            settings,
        }
    }

    /// Build the production pipeline: configured embeddings, MongoDB Atlas and Groq.
    pub async fn from_config(config: &Config) -> Result<Self, ChatError> {
        tracing::info!("Initializing embedding client");
        let embedding_client: Arc<dyn EmbeddingClient> = Arc::from(get_embedding_client(config)?);
        tracing::info!("Connecting to MongoDB Atlas");
        let vector_store = Arc::new(AtlasVectorStore::connect(config).await?);
        let language_model = Arc::new(GroqClient::from_config(config)?);
        tracing::info!(model = %language_model.model_name(), "Language model client initialized");

        let idle_timeout = match config.session_idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let sessions = Arc::new(SessionStore::new(config.memory_max_turns, idle_timeout));

        Ok(Self::new(
            embedding_client,
            vector_store,
            language_model,
            sessions,
            ChatSettings {
                top_k: config.retrieval_top_k,
                embedding_dimension: config.embedding_dimension,
            },
        ))
    }

    /// Shared session store backing this service.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer a question within a session.
    pub async fn handle_chat(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<ChatOutcome, ChatError> {
        let question = query.trim();
        let history = self.sessions.snapshot(session_id).await;
        tracing::info!(
            session = session_id,
            history_turns = history.len(),
            "Handling chat request"
        );

        let standalone = self.standalone_question(&history, question).await?;
        let vector = self.embed(&standalone).await?;
        let chunks = self
            .vector_store
            .similarity_search(vector, self.settings.top_k)
            .await?;
        tracing::debug!(
            session = session_id,
            chunks = chunks.len(),
            top_score = ?chunks.iter().filter_map(|chunk| chunk.score).reduce(f64::max),
            "Retrieved context"
        );

        let answer = self
            .language_model
            .complete(answer_messages(&chunks, &standalone))
            .await?;

        let sources: Vec<SourceReference> = chunks
            .iter()
            .map(|chunk| SourceReference {
                source: source_name(chunk),
            })
            .collect();

        let chat_history = self
            .sessions
            .record_exchange(session_id, question, answer.as_str())
            .await;
        tracing::info!(
            session = session_id,
            sources = sources.len(),
            history_turns = chat_history.len(),
            "Chat request answered"
        );

        Ok(ChatOutcome {
            answer,
            sources,
            chat_history,
        })
    }

    async fn standalone_question(
        &self,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String, ChatError> {
        if history.is_empty() {
            return Ok(question.to_string());
        }
        let condensed = self
            .language_model
            .complete(condense_messages(history, question))
            .await?;
        tracing::debug!(original = question, standalone = %condensed, "Condensed follow-up question");
        Ok(condensed)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ChatError> {
        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![text.to_string()])
            .await?;
        let vector = vectors.pop().ok_or(ChatError::EmptyEmbedding)?;
        if let Some(expected) = self.settings.embedding_dimension
            && vector.len() != expected
        {
            return Err(ChatError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

#[async_trait]
impl ChatApi for ChatService {
    async fn chat(&self, session_id: &str, query: &str) -> Result<ChatOutcome, ChatError> {
        ChatService::handle_chat(self, session_id, query).await
    }

    async fn reset_memory(&self, session_id: &str) {
        self.sessions.reset(session_id).await;
    }
}
