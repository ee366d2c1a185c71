/// Reciperank error types
#[derive(Debug, thiserror::Error)]
pub enum ReciperankError {
    /// Malformed or missing field in corpus, query or label input
    #[error("Schema error in {subject}: {message}")]
    Schema { subject: String, message: String },

    /// Embedding dimension mismatch
    #[error("Dimension mismatch for {subject}: expected {expected}, got {actual}")]
    Dimension {
        subject: String,
        expected: usize,
        actual: usize,
    },

    /// Vector that cannot be normalized (zero norm or non-finite component)
    #[error("Degenerate vector for {id}: {reason}")]
    DegenerateVector { id: String, reason: String },

    /// Label vector length differs from the run-wide cutoff K
    #[error("Query {query_id} has {actual} labels, expected exactly {expected}")]
    LabelLength {
        query_id: String,
        expected: usize,
        actual: usize,
    },

    /// Transient embedding provider failure (retryable)
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// Request refused by the provider (unknown model, bad request)
    #[error("Embedding provider rejected request: {0}")]
    ProviderRejected(String),

    /// Provider quota or rate limit reached (never retried)
    #[error("Embedding provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReciperankError {
    /// Create schema error for a named record, query or array position
    pub fn schema<S: Into<String>, M: Into<String>>(subject: S, message: M) -> Self {
        Self::Schema {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Create dimension error
    pub fn dimension<S: Into<String>>(subject: S, expected: usize, actual: usize) -> Self {
        Self::Dimension {
            subject: subject.into(),
            expected,
            actual,
        }
    }

    /// Create degenerate vector error
    pub fn degenerate<S: Into<String>, R: Into<String>>(id: S, reason: R) -> Self {
        Self::DegenerateVector {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create label length error
    pub fn label_length<S: Into<String>>(query_id: S, expected: usize, actual: usize) -> Self {
        Self::LabelLength {
            query_id: query_id.into(),
            expected,
            actual,
        }
    }

    /// Create provider error
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::Provider(msg.into())
    }

    /// Create provider rejection error
    pub fn provider_rejected<S: Into<String>>(msg: S) -> Self {
        Self::ProviderRejected(msg.into())
    }

    /// Create quota exceeded error
    pub fn quota_exceeded<S: Into<String>>(msg: S) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a retry policy may attempt the failed call again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

impl From<config::ConfigError> for ReciperankError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
