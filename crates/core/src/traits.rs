use async_trait::async_trait;

use crate::error::ProviderError;

#[async_trait]
pub trait EmbeddingProvider {
    // One vector per input, same order; empty input yields empty
    // output. Returned vectors need not be pre-normalized.
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, ProviderError>;
}

#[async_trait]
pub trait ChatProvider {
    // An empty string is a valid answer.
    async fn complete(
        &self,
        question: &str,
        context: &str,
        model: &str,
    ) -> Result<String, ProviderError>;
}
