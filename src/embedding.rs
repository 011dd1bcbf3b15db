//! Embedding Provider Abstraction
//!
//! Defines the async `EmbeddingProvider` trait behind which the concrete
//! embedding backend lives. The trait is object-safe and `Send + Sync` so
//! one provider instance can serve concurrent `analyze` calls and the
//! ingest path alike.

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::Retryable;

/// Errors from embedding operations.
#[derive(Error, Debug, Clone)]
pub enum EmbeddingError {
    /// Authentication failed (invalid or missing API key).
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Configuration is invalid or incomplete.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// The input batch exceeds the provider's maximum batch size.
    #[error("batch size {requested} exceeds maximum {max_allowed}")]
    BatchSizeLimitExceeded { requested: usize, max_allowed: usize },

    /// A network or connection error occurred.
    #[error("network error: {message}")]
    NetworkError { message: String },

    /// The provider returned an HTTP error.
    #[error("server error (HTTP {status}): {message}")]
    ServerError { message: String, status: u16 },

    /// The provider returned an unexpected or unparseable response.
    #[error("parse error: {message}")]
    ParseError { message: String },
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::NetworkError { .. } | EmbeddingError::ServerError { .. }
        )
    }
}

/// Convenience alias for embedding operation results.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Async trait for embedding providers.
///
/// Implementations produce dense vectors of a fixed dimensionality; the
/// returned vectors are in the same order as the input texts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of document texts, one vector per input.
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Embed a single query text.
    ///
    /// The default implementation delegates to `embed_documents` with a
    /// one-element slice.
    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        let results = self.embed_documents(&[query]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ParseError {
                message: "embed_documents returned no vector for a single query".to_string(),
            })
    }

    /// Dimensionality of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Maximum number of texts accepted per `embed_documents` call.
    fn max_batch_size(&self) -> usize;
}
