//! Reciperank embedding providers
//!
//! Ollama API client and a deterministic offline embedder behind one trait

mod client;
mod hashing;
mod provider;
mod types;

pub use client::{classify_status, OllamaClient};
pub use hashing::HashEmbedder;
pub use provider::{provider_from_config, EmbeddingProvider};
pub use types::{EmbedRequest, EmbedResponse};
