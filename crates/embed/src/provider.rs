use async_trait::async_trait;
use reciperank_common::{AppConfig, EmbeddingBackend, Result};
use std::sync::Arc;

use crate::client::OllamaClient;
use crate::hashing::HashEmbedder;

/// Text → dense vector provider
///
/// Implementations must be deterministic for a fixed `model_id` and input.
/// Failures are surfaced as errors, never as substitute vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identity; vectors are only comparable within one identity
    fn model_id(&self) -> &str;

    /// Generate embedding for text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build the provider selected by the run configuration
pub fn provider_from_config(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embedding_backend {
        EmbeddingBackend::Ollama => Arc::new(OllamaClient::from_config(config)?),
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.hash_dimension)),
    };
    Ok(provider)
}
