mod ollama;
mod openai;

pub use ollama::{OllamaProvider, DEFAULT_OLLAMA_URL};
pub use openai::{OpenAiProvider, DEFAULT_OPENAI_URL};

use reqwest::{Response, StatusCode};

use crate::error::ProviderError;

pub(crate) fn unreachable(
    service: &'static str,
    endpoint: &str,
    source: reqwest::Error,
) -> ProviderError {
    ProviderError::Unreachable {
        service,
        endpoint: endpoint.to_string(),
        source,
    }
}

// Both Ollama and OpenAI signal an unknown model with 404.
pub(crate) async fn check_status(
    response: Response,
    service: &'static str,
    model: &str,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND || body.contains("not found") || body.contains("model_not_found")
    {
        return Err(ProviderError::UnknownModel {
            service,
            model: model.to_string(),
        });
    }

    Err(ProviderError::Backend {
        service,
        status,
        body,
    })
}
