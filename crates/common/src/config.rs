use crate::error::ReciperankError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Embedding backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Remote Ollama embeddings API
    Ollama,
    /// Deterministic offline feature-hashing embedder
    Hash,
}

/// Named corpus to index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset name, used for log lines and output file names
    pub name: String,

    /// Path to the corpus JSON file
    pub path: PathBuf,
}

impl DatasetConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Reciperank run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Corpora to index, processed in order
    pub datasets: Vec<DatasetConfig>,

    /// Queries file path
    pub queries_path: PathBuf,

    /// Directory for retrieval output files
    pub output_dir: PathBuf,

    /// Embedding backend
    pub embedding_backend: EmbeddingBackend,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Dimension of the offline hash embedder
    pub hash_dimension: usize,

    /// Per-request provider timeout in seconds
    pub request_timeout_secs: u64,

    /// Results retrieved per query (K)
    pub top_k: usize,

    /// Metric cutoffs, each in 1..=top_k
    pub cutoffs: Vec<usize>,

    /// Maximum in-flight embedding requests
    pub concurrency: usize,

    /// Provider retry policy
    pub retry: RetryPolicy,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            datasets: vec![
                DatasetConfig::new("RecipeNLG", "RecipeNLG_dataset/recipes_nlg_clean.json"),
                DatasetConfig::new("Spoonacular", "Spoonacular_API/spoonacular_dataset.json"),
            ],
            queries_path: PathBuf::from("manual_queries.json"),
            output_dir: PathBuf::from("retrieval_results"),
            embedding_backend: EmbeddingBackend::Ollama,
            ollama_base_url: "http://localhost:11434".to_string(),
            embedding_model: "all-minilm".to_string(),
            hash_dimension: 384,
            request_timeout_secs: 60,
            top_k: 5,
            cutoffs: vec![1, 3, 5],
            concurrency: 8,
            retry: RetryPolicy::default(),
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then optional TOML/JSON file, then
    /// `RECIPERANK__*` environment variables (after reading `.env`).
    pub fn load(path: Option<&Path>) -> Result<Self, ReciperankError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(ReciperankError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("RECIPERANK").separator("__"),
        );

        let built = builder.build()?;
        let explicit_cutoffs = built.get::<Vec<usize>>("cutoffs").is_ok();
        let mut config: Self = built.try_deserialize()?;
        if !explicit_cutoffs {
            config.fit_cutoffs();
        }
        config.validate()?;
        Ok(config)
    }

    /// Set K, dropping cutoffs above it; K itself is used when none remain
    pub fn set_top_k(&mut self, top_k: usize) {
        self.top_k = top_k;
        self.fit_cutoffs();
    }

    fn fit_cutoffs(&mut self) {
        let top_k = self.top_k;
        self.cutoffs.retain(|&k| k <= top_k);
        if self.cutoffs.is_empty() {
            self.cutoffs.push(top_k);
        }
    }

    /// Output file for a dataset's retrieval results
    pub fn results_path(&self, dataset: &str) -> PathBuf {
        self.output_dir.join(format!("{}_results.json", dataset))
    }

    /// Ensure output and log directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), ReciperankError> {
        for dir in [&self.output_dir, &self.log_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    ReciperankError::config(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ReciperankError> {
        if self.top_k == 0 {
            return Err(ReciperankError::config("top_k must be at least 1"));
        }

        if self.cutoffs.is_empty() {
            return Err(ReciperankError::config("cutoffs cannot be empty"));
        }

        if let Some(k) = self.cutoffs.iter().find(|&&k| k == 0 || k > self.top_k) {
            return Err(ReciperankError::config(format!(
                "cutoff {} must be between 1 and top_k ({})",
                k, self.top_k
            )));
        }

        if self.concurrency == 0 {
            return Err(ReciperankError::config("concurrency must be at least 1"));
        }

        if self.retry.max_attempts == 0 {
            return Err(ReciperankError::config("retry.max_attempts must be at least 1"));
        }

        if self.embedding_backend == EmbeddingBackend::Ollama
            && !self.ollama_base_url.starts_with("http://")
            && !self.ollama_base_url.starts_with("https://")
        {
            return Err(ReciperankError::config(
                "Ollama base URL must start with http:// or https://",
            ));
        }

        if self.embedding_backend == EmbeddingBackend::Hash && self.hash_dimension == 0 {
            return Err(ReciperankError::config("hash_dimension must be at least 1"));
        }

        Ok(())
    }
}
