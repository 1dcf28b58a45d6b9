use async_trait::async_trait;
use interestlens_core::{CoreError, Embedder, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::retry::{CircuitBreaker, RetryPolicy};

const NAME: &str = "embedder";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint
#[derive(Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl HttpEmbedder {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            retry: RetryPolicy::default(),
            breaker: CircuitBreaker::new(5, Duration::from_secs(30)),
        }
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            input: text,
            model: &self.model,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::collaborator(NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::collaborator(
                NAME,
                format!("endpoint returned {status}"),
            ));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| CoreError::collaborator(NAME, format!("invalid response: {e}")))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| CoreError::collaborator(NAME, "response contained no embedding"))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.breaker.is_open() {
            return Err(CoreError::collaborator(NAME, "circuit open"));
        }

        let result = self.retry.execute("embed", || self.request(text)).await;
        match &result {
            Ok(embedding) => {
                self.breaker.record_success();
                debug!("Embedded {} chars into {} dimensions", text.len(), embedding.len());
            },
            Err(_) => self.breaker.record_failure(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25]}],"model":"m"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.5, -0.25]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_collaborator_error() {
        let embedder = HttpEmbedder::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/embeddings",
            None,
            "test-model",
        );
        let err = embedder.request("hello").await.unwrap_err();
        assert!(matches!(err, CoreError::Collaborator { .. }));
    }
}
