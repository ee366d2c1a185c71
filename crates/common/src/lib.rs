pub mod config;
pub mod dataset;
pub mod error;
pub mod logger;
pub mod retry;

// Re-export commonly used types
pub use config::{AppConfig, DatasetConfig, EmbeddingBackend};
pub use dataset::{load_corpus, load_queries, Instructions, JsonId, Query, Recipe};
pub use error::ReciperankError;
pub use retry::{retry, DelayStrategy, RetryPolicy, Sleeper, TokioSleeper};
pub type Result<T> = std::result::Result<T, ReciperankError>;
