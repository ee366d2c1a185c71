use async_trait::async_trait;
use reciperank_common::{retry, AppConfig, ReciperankError, Result, RetryPolicy, Sleeper, TokioSleeper};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::provider::EmbeddingProvider;
use crate::types::{EmbedRequest, EmbedResponse};

/// Ollama embeddings API client
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
    retry_policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let model = model.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Ollama client initialized: {} (model={})", base_url, model);
        Ok(Self {
            base_url,
            model,
            client,
            retry_policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Create client from run configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            &config.ollama_base_url,
            &config.embedding_model,
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_retry_policy(config.retry))
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Replace the clock used between retries
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Test connection to Ollama
    pub async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReciperankError::provider(format!("Failed to connect to Ollama: {}", e)))?;
        Ok(response.status().is_success())
    }

    /// Single attempt to generate embedding
    async fn try_embed(&self, url: &str, request: &EmbedRequest) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ReciperankError::provider(format!("Failed to send embedding request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse embedding response: {}", e))?;

        if result.embedding.is_empty() {
            return Err(anyhow::anyhow!("Empty embedding from Ollama").into());
        }

        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        debug!("Generating embedding - Model: {}, Text length: {}", self.model, text.len());

        let embedding = retry(&self.retry_policy, self.sleeper.as_ref(), "Embedding request", |_| {
            self.try_embed(&url, &request)
        })
        .await?;

        debug!("Received embedding - Dimension: {}", embedding.len());
        Ok(embedding)
    }
}

/// Map a non-success HTTP status to a provider error.
///
/// 402 (quota exhausted) and 429 (rate limited) stop the whole run. Server
/// errors and 408 are transient; any other client error is a rejection that
/// retrying cannot fix.
pub fn classify_status(status: StatusCode, body: &str) -> ReciperankError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body.trim())
    };

    match status {
        StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => {
            ReciperankError::quota_exceeded(detail)
        }
        StatusCode::REQUEST_TIMEOUT => ReciperankError::provider(detail),
        s if s.is_server_error() => ReciperankError::provider(detail),
        _ => ReciperankError::provider_rejected(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reciperank_common::DelayStrategy;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    /// Swaps the server's mocks for a healthy embeddings endpoint on the
    /// first wait, so the next attempt succeeds
    struct RecoveringSleeper {
        server: Arc<MockServer>,
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecoveringSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
            // httpmock's async API is not Send; run the sync API off the runtime
            let server = Arc::clone(&self.server);
            tokio::task::spawn_blocking(move || {
                server.reset();
                server.mock(|when, then| {
                    when.method(POST).path("/api/embeddings");
                    then.status(200).json_body(json!({"embedding": [0.25, -0.5, 1.0]}));
                });
            })
            .await
            .unwrap();
        }
    }

    fn fixed_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: DelayStrategy::Fixed { delay_ms: 250 },
        }
    }

    fn client_for(server: &MockServer, sleeper: Arc<dyn Sleeper>) -> OllamaClient {
        OllamaClient::new(server.base_url(), "all-minilm", Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(fixed_policy())
            .with_sleeper(sleeper)
    }

    #[test]
    fn test_quota_statuses_are_fatal() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ReciperankError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::PAYMENT_REQUIRED, "daily points limit"),
            ReciperankError::QuotaExceeded(_)
        ));
    }

    #[test]
    fn test_server_errors_are_transient() {
        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE, "model loading");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("model loading"));
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT, "").is_retryable());
    }

    #[test]
    fn test_client_errors_are_rejections() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND] {
            let err = classify_status(status, "model \"nope\" not found");
            assert!(matches!(err, ReciperankError::ProviderRejected(_)));
            assert!(!err.is_retryable());
        }
    }

    #[tokio::test]
    async fn test_embed_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embeddings")
                    .json_body(json!({"model": "all-minilm", "prompt": "vegan soup"}));
                then.status(200).json_body(json!({"embedding": [0.5, 0.5]}));
            })
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_for(&server, sleeper.clone());

        assert_eq!(client.embed("vegan soup").await.unwrap(), vec![0.5, 0.5]);
        mock.assert_hits_async(1).await;
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quota_status_is_sent_once() {
        for status in [429, 402] {
            let server = MockServer::start_async().await;
            let mock = server
                .mock_async(|when, then| {
                    when.method(POST).path("/api/embeddings");
                    then.status(status).body("quota exhausted");
                })
                .await;

            let sleeper = Arc::new(RecordingSleeper::default());
            let result = client_for(&server, sleeper.clone()).embed("vegan soup").await;

            assert!(matches!(result, Err(ReciperankError::QuotaExceeded(_))), "status {}", status);
            mock.assert_hits_async(1).await;
            assert!(sleeper.slept.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_model_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(404).body(r#"{"error":"model \"all-minilm\" not found"}"#);
            })
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let result = client_for(&server, sleeper.clone()).embed("vegan soup").await;

        assert!(matches!(result, Err(ReciperankError::ProviderRejected(_))));
        mock.assert_hits_async(1).await;
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_then_ok_is_retried() {
        let server = Arc::new(MockServer::start_async().await);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(503).body("model loading");
            })
            .await;

        let sleeper = Arc::new(RecoveringSleeper {
            server: server.clone(),
            slept: Mutex::new(Vec::new()),
        });
        let client = client_for(&server, sleeper.clone());

        assert_eq!(client.embed("vegan soup").await.unwrap(), vec![0.25, -0.5, 1.0]);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_millis(250)]
        );
    }

    #[tokio::test]
    async fn test_persistent_outage_exhausts_attempts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(503).body("model loading");
            })
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let result = client_for(&server, sleeper.clone()).embed("vegan soup").await;

        assert!(matches!(result, Err(ReciperankError::Provider(_))));
        mock.assert_hits_async(3).await;
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_millis(250); 2]
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200).body("<html>proxy error</html>");
            })
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let result = client_for(&server, sleeper.clone()).embed("vegan soup").await;

        assert!(matches!(result, Err(ReciperankError::Other(_))));
        mock.assert_hits_async(1).await;
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection_check() {
        let server = MockServer::start_async().await;
        let tags = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(200).json_body(json!({"models": []}));
            })
            .await;

        let client = client_for(&server, Arc::new(RecordingSleeper::default()));
        assert!(client.test_connection().await.unwrap());
        tags.assert_async().await;

        server.reset_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(500);
            })
            .await;
        assert!(!client.test_connection().await.unwrap());
    }
}
