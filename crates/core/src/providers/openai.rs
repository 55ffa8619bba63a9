use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, unreachable};
use crate::error::ProviderError;
use crate::traits::{ChatProvider, EmbeddingProvider};

const SERVICE: &str = "openai";

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

const CHAT_TIMEOUT: Duration = Duration::from_secs(45);
const EMBED_TIMEOUT: Duration = Duration::from_secs(120);
const ANSWER_MAX_TOKENS: u32 = 150;

const SYSTEM_PROMPT: &str =
    "You are a helpful document assistant. Answer using only the provided context.";

// Works against any server that speaks the OpenAI wire format.
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "OpenAI API key is empty; set OPENAI_API_KEY".to_string(),
            ));
        }

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        })
    }

    pub fn from_env(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ProviderError::Configuration("OPENAI_API_KEY is not set".to_string())
        })?;
        Self::new(base_url, api_key)
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let endpoint = format!("{}/v1/embeddings", self.base_url);
        let request = EmbedRequest {
            model: model.to_string(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&endpoint)
            .timeout(EMBED_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| unreachable(SERVICE, &endpoint, error))?;

        let response = check_status(response, SERVICE, model).await?;
        let parsed: EmbedResponse = response.json().await.map_err(|error| {
            ProviderError::Response {
                service: SERVICE,
                details: error.to_string(),
            }
        })?;

        if parsed.data.len() != texts.len() {
            return Err(ProviderError::Response {
                service: SERVICE,
                details: format!(
                    "{} embeddings returned for {} inputs",
                    parsed.data.len(),
                    texts.len()
                ),
            });
        }

        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(
        &self,
        question: &str,
        context: &str,
        model: &str,
    ) -> Result<String, ProviderError> {
        let endpoint = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Context: {context}\n\nQuestion: {question}\n\nAnswer briefly with citations:"
                    ),
                },
            ],
            max_tokens: ANSWER_MAX_TOKENS,
            temperature: 0.1,
        };

        let response = self
            .client
            .post(&endpoint)
            .timeout(CHAT_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| unreachable(SERVICE, &endpoint, error))?;

        let response = check_status(response, SERVICE, model).await?;
        let parsed: ChatResponse = response.json().await.map_err(|error| {
            ProviderError::Response {
                service: SERVICE,
                details: error.to_string(),
            }
        })?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(answer.trim().to_string())
    }
}
