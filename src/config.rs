use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_MONGODB_DB: &str = "my_db";
const DEFAULT_MONGODB_COLLECTION: &str = "vector_docs";
const DEFAULT_VECTOR_INDEX: &str = "vector_index";
const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-mpnet-base-v2";
const DEFAULT_HF_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the chat server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string for the MongoDB Atlas cluster holding the document chunks.
    pub mongodb_uri: String,
    /// Database containing the vector collection.
    pub mongodb_db: String,
    /// Collection holding embedded chunks.
    pub mongodb_collection: String,
    /// Name of the Atlas vector search index.
    pub vector_index_name: String,
    /// Document field that stores the chunk text.
    pub vector_text_key: String,
    /// Document field that stores the chunk embedding.
    pub vector_embedding_key: String,
    /// Number of chunks retrieved per question.
    pub retrieval_top_k: usize,
    /// Embedding provider used to vectorize questions.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Optional expected dimensionality of the produced vectors.
    pub embedding_dimension: Option<usize>,
    /// Bearer token for the Hugging Face Inference API.
    pub huggingface_api_token: Option<String>,
    /// Base URL of the Hugging Face Inference API.
    pub huggingface_api_url: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Bearer token for the Groq API.
    pub groq_api_key: String,
    /// Chat model used for answers and question condensing.
    pub groq_model: String,
    /// Sampling temperature sent with every completion.
    pub groq_temperature: f32,
    /// Base URL of the OpenAI-compatible Groq API.
    pub groq_base_url: String,
    /// Optional cap on the number of turns kept per conversation.
    pub memory_max_turns: Option<usize>,
    /// Idle time after which a non-default session is evicted; zero disables eviction.
    pub session_idle_timeout_secs: u64,
    /// Period of the idle session sweeper.
    pub session_sweep_interval_secs: u64,
    /// Interface the HTTP server binds to.
    pub server_host: String,
    /// Port the HTTP server binds to.
    pub server_port: u16,
}

/// Supported embedding backends for question vectorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hosted Hugging Face Inference API (feature-extraction pipeline).
    HuggingFace,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            mongodb_uri: load_env("MONGODB_URI")?,
            mongodb_db: load_env_or("MONGODB_DB", DEFAULT_MONGODB_DB),
            mongodb_collection: load_env_or("MONGODB_COLLECTION", DEFAULT_MONGODB_COLLECTION),
            vector_index_name: load_env_or("MONGODB_VECTOR_INDEX", DEFAULT_VECTOR_INDEX),
            vector_text_key: load_env_or("MONGODB_TEXT_KEY", "text"),
            vector_embedding_key: load_env_or("MONGODB_EMBEDDING_KEY", "embedding"),
            retrieval_top_k: at_least("RETRIEVAL_TOP_K", parse_env("RETRIEVAL_TOP_K")?, 1)?
                .unwrap_or(4),
            embedding_provider: load_env_optional("EMBEDDING_PROVIDER")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))
                })
                .transpose()?
                .unwrap_or(EmbeddingProvider::HuggingFace),
            embedding_model: load_env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimension: parse_env("EMBEDDING_DIMENSION")?,
            huggingface_api_token: load_env_optional("HF_TOKEN")
                .or_else(|| load_env_optional("HUGGINGFACEHUB_API_TOKEN")),
            huggingface_api_url: load_env_or("HF_INFERENCE_URL", DEFAULT_HF_INFERENCE_URL),
            ollama_url: load_env_or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            groq_api_key: load_env("GROQ_API_KEY")?,
            groq_model: load_env_or("GROQ_MODEL", DEFAULT_GROQ_MODEL),
            groq_temperature: parse_env("GROQ_TEMPERATURE")?.unwrap_or(0.5),
            groq_base_url: load_env_or("GROQ_BASE_URL", DEFAULT_GROQ_BASE_URL),
            // One full exchange is the smallest useful history.
            memory_max_turns: at_least("MEMORY_MAX_TURNS", parse_env("MEMORY_MAX_TURNS")?, 2)?,
            session_idle_timeout_secs: parse_env("SESSION_IDLE_TIMEOUT_SECS")?.unwrap_or(3600),
            session_sweep_interval_secs: parse_env("SESSION_SWEEP_INTERVAL_SECS")?.unwrap_or(60),
            server_host: load_env_or("SERVER_HOST", "0.0.0.0"),
            server_port: parse_env("SERVER_PORT")?.unwrap_or(8000),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn at_least(key: &str, value: Option<usize>, min: usize) -> Result<Option<usize>, ConfigError> {
    match value {
        Some(value) if value < min => Err(ConfigError::InvalidValue(key.to_string())),
        other => Ok(other),
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment (and `.env`) and install it in the global cache.
///
/// The first successful load wins; later calls return the cached value.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        database = %config.mongodb_db,
        collection = %config.mongodb_collection,
        index = %config.vector_index_name,
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        llm_model = %config.groq_model,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_provider_parses_case_insensitively() {
        assert_eq!(
            "HuggingFace".parse::<EmbeddingProvider>(),
            Ok(EmbeddingProvider::HuggingFace)
        );
        assert_eq!("hf".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::HuggingFace));
        assert_eq!("OLLAMA".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Ollama));
        assert!("openai".parse::<EmbeddingProvider>().is_err());
    }

    #[test]
    fn missing_variable_names_the_key() {
        let error = load_env("RAGCHAT_TEST_DEFINITELY_UNSET").expect_err("unset variable");
        assert_eq!(
            error.to_string(),
            "Missing environment variable: RAGCHAT_TEST_DEFINITELY_UNSET"
        );
    }

    #[test]
    fn unset_optional_values_fall_back() {
        assert_eq!(
            load_env_or("RAGCHAT_TEST_DEFINITELY_UNSET", "my_db"),
            "my_db".to_string()
        );
        let parsed: Option<usize> =
            parse_env("RAGCHAT_TEST_DEFINITELY_UNSET").expect("absent value is not an error");
        assert_eq!(parsed, None);
    }

    #[test]
    fn lower_bounds_reject_small_values() {
        assert!(matches!(
            at_least("RETRIEVAL_TOP_K", Some(0), 1),
            Err(ConfigError::InvalidValue(key)) if key == "RETRIEVAL_TOP_K"
        ));
        assert!(matches!(
            at_least("MEMORY_MAX_TURNS", Some(1), 2),
            Err(ConfigError::InvalidValue(key)) if key == "MEMORY_MAX_TURNS"
        ));
        assert_eq!(at_least("RETRIEVAL_TOP_K", Some(1), 1).ok(), Some(Some(1)));
        assert_eq!(at_least("MEMORY_MAX_TURNS", None, 2).ok(), Some(None));
    }
}
