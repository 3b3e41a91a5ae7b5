use super::{LanguageModel, LanguageModelError, PromptMessage};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Chat completions client for Groq's OpenAI-compatible endpoint.
pub struct GroqClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GroqClient {
    /// Construct a client from explicit settings.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self, LanguageModelError> {
        let http = Client::builder()
            .user_agent("ragchat/0.1")
            .build()
            .map_err(|error| LanguageModelError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        })
    }

    /// Construct a client from the Groq settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self, LanguageModelError> {
        Self::new(
            &config.groq_base_url,
            config.groq_api_key.clone(),
            config.groq_model.clone(),
            config.groq_temperature,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for GroqClient {
    async fn complete(&self, messages: Vec<PromptMessage>) -> Result<String, LanguageModelError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                LanguageModelError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = LanguageModelError::UnexpectedStatus { status, body };
            tracing::error!(model = %self.model, error = %error, "Chat completion failed");
            return Err(error);
        }

        let body: CompletionResponse = response.json().await.map_err(|error| {
            LanguageModelError::InvalidResponse(format!(
                "failed to decode completion response: {error}"
            ))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LanguageModelError::InvalidResponse("completion had no content".into()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
