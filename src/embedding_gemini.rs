//! Gemini Embedding Provider
//!
//! Implements `EmbeddingProvider` for Google's Gemini embedding models over
//! the REST API.
//!
//! ## API Details
//!
//! - Batch: `POST {base}/models/{model}:batchEmbedContents`
//! - Single: `POST {base}/models/{model}:embedContent`
//! - Auth: `x-goog-api-key: {api_key}` header
//! - Batch body: `{ requests: [{ model, content: { parts: [{ text }] } }] }`
//! - Batch response: `{ embeddings: [{ values: [f32] }] }`, input order preserved
//!
//! Supports a custom `base_url` for Gemini-compatible gateways and tests.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CoachConfig;
use crate::embedding::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use crate::http_client::build_http_client;

/// Default Gemini REST API base.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Output dimension of `text-embedding-004`.
const EMBEDDING_DIMENSION: usize = 768;

/// Maximum inputs per `batchEmbedContents` request.
const MAX_BATCH_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeminiBatchEmbedResponse {
    embeddings: Vec<GeminiEmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiEmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: Option<String>,
    #[allow(dead_code)]
    status: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// Gemini embedding provider over the REST API.
///
/// The reqwest `Client` is internally arc'd and all fields are immutable
/// after construction, so the provider is freely shareable across tasks.
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiEmbeddingProvider {
    /// Create a provider from the engine configuration.
    pub fn new(config: &CoachConfig) -> Self {
        Self {
            client: build_http_client(config.request_timeout),
            api_key: config.google_api_key.clone(),
            model: config.embedding_model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_API_BASE.to_string()),
        }
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, operation)
    }

    fn build_batch_body(&self, documents: &[&str]) -> serde_json::Value {
        let requests: Vec<serde_json::Value> = documents
            .iter()
            .map(|text| {
                serde_json::json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();
        serde_json::json!({ "requests": requests })
    }

    fn build_single_body(&self, query: &str) -> serde_json::Value {
        serde_json::json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": query }] },
        })
    }

    /// POST `body` to `operation` and hand back the raw response text.
    async fn post(&self, operation: &str, body: &serde_json::Value) -> EmbeddingResult<String> {
        if self.api_key.is_empty() {
            return Err(EmbeddingError::AuthenticationFailed {
                message: "Gemini API key is not configured (GOOGLE_API_KEY)".to_string(),
            });
        }

        let response = self
            .client
            .post(self.endpoint(operation))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| EmbeddingError::NetworkError {
                message: format!("failed to read response body: {}", e),
            })?;

        if status == 200 {
            Ok(text)
        } else {
            Err(self.map_http_error(status, &text))
        }
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::NetworkError {
                message: format!("request to {} timed out", self.base_url),
            }
        } else if err.is_connect() {
            EmbeddingError::NetworkError {
                message: format!("cannot connect to Gemini API at {}: {}", self.base_url, err),
            }
        } else {
            EmbeddingError::NetworkError {
                message: err.to_string(),
            }
        }
    }

    fn map_http_error(&self, status: u16, body_text: &str) -> EmbeddingError {
        let message = serde_json::from_str::<GeminiErrorResponse>(body_text)
            .ok()
            .and_then(|r| r.error)
            .and_then(|d| d.message)
            .unwrap_or_else(|| body_text.to_string());

        match status {
            401 | 403 => EmbeddingError::AuthenticationFailed {
                message: format!("Gemini rejected the API key: {}", message),
            },
            400 => EmbeddingError::InvalidConfig {
                message: format!("Gemini bad request for model '{}': {}", self.model, message),
            },
            404 => EmbeddingError::InvalidConfig {
                message: format!(
                    "embedding model '{}' not found at {}: {}",
                    self.model, self.base_url, message
                ),
            },
            _ => EmbeddingError::ServerError { message, status },
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        if documents.len() > MAX_BATCH_SIZE {
            return Err(EmbeddingError::BatchSizeLimitExceeded {
                requested: documents.len(),
                max_allowed: MAX_BATCH_SIZE,
            });
        }

        let body = self.build_batch_body(documents);
        let text = self.post("batchEmbedContents", &body).await?;
        let parsed: GeminiBatchEmbedResponse =
            serde_json::from_str(&text).map_err(|e| EmbeddingError::ParseError {
                message: format!("failed to parse batch embedding response: {}", e),
            })?;

        if parsed.embeddings.len() != documents.len() {
            return Err(EmbeddingError::ParseError {
                message: format!(
                    "expected {} embeddings but Gemini returned {}",
                    documents.len(),
                    parsed.embeddings.len()
                ),
            });
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        let body = self.build_single_body(query);
        let text = self.post("embedContent", &body).await?;
        let parsed: GeminiEmbedResponse =
            serde_json::from_str(&text).map_err(|e| EmbeddingError::ParseError {
                message: format!("failed to parse embedding response: {}", e),
            })?;
        Ok(parsed.embedding.values)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
