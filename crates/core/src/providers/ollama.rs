use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, unreachable};
use crate::error::ProviderError;
use crate::traits::{ChatProvider, EmbeddingProvider};

const SERVICE: &str = "ollama";

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

const ANSWER_MAX_TOKENS: u32 = 120;
const CHAT_TIMEOUT: Duration = Duration::from_secs(45);
const EMBED_TIMEOUT: Duration = Duration::from_secs(120);

const PROMPT_CONTEXT_CHARS: usize = 1200;

pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    // Lists the model names the service has available.
    pub async fn health(&self) -> Result<Vec<String>, ProviderError> {
        let endpoint = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&endpoint)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map_err(|error| unreachable(SERVICE, &endpoint, error))?;

        let response = check_status(response, SERVICE, "").await?;
        let parsed: TagsResponse = response.json().await.map_err(|error| {
            ProviderError::Response {
                service: SERVICE,
                details: error.to_string(),
            }
        })?;

        Ok(parsed.models.into_iter().map(|model| model.name).collect())
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
    // The service truncates over-long inputs instead of rejecting the
    // whole batch.
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    top_k: u32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let endpoint = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: model.to_string(),
            input: texts.to_vec(),
            truncate: true,
        };

        let response = self
            .client
            .post(&endpoint)
            .timeout(EMBED_TIMEOUT)
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

        if parsed.embeddings.len() != texts.len() {
            return Err(ProviderError::Response {
                service: SERVICE,
                details: format!(
                    "{} embeddings returned for {} inputs",
                    parsed.embeddings.len(),
                    texts.len()
                ),
            });
        }

        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    async fn complete(
        &self,
        question: &str,
        context: &str,
        model: &str,
    ) -> Result<String, ProviderError> {
        let endpoint = format!("{}/api/generate", self.base_url);

        let clipped: String = context.chars().take(PROMPT_CONTEXT_CHARS).collect();
        let prompt = format!(
            "Based on this context, answer briefly:\n\nContext: {clipped}...\n\nQ: {question}\nA:"
        );

        let request = GenerateRequest {
            model: model.to_string(),
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.1,
                num_predict: ANSWER_MAX_TOKENS,
                top_k: 20,
                top_p: 0.9,
                repeat_penalty: 1.1,
            },
        };

        let response = self
            .client
            .post(&endpoint)
            .timeout(CHAT_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|error| unreachable(SERVICE, &endpoint, error))?;

        let response = check_status(response, SERVICE, model).await?;
        let parsed: GenerateResponse = response.json().await.map_err(|error| {
            ProviderError::Response {
                service: SERVICE,
                details: error.to_string(),
            }
        })?;

        Ok(parsed.response.trim().to_string())
    }
}
