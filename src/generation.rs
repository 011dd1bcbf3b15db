//! Generative Provider Abstraction
//!
//! Defines the async `GenerationProvider` trait for structured-output text
//! generation. A provider takes one fully composed prompt and returns the
//! model's raw textual output; schema parsing happens upstream so the
//! provider stays schema-agnostic.

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::Retryable;

/// Errors from generative operations.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    /// Authentication failed (invalid or missing API key).
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Configuration is invalid or incomplete.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// The backend withheld its output, with the backend's stated reason
    /// (e.g. a safety-filter category).
    #[error("response blocked: {reason}")]
    Blocked { reason: String },

    /// The backend answered successfully but produced no usable text.
    #[error("empty response from model")]
    EmptyResponse,

    /// A network or connection error occurred.
    #[error("network error: {message}")]
    NetworkError { message: String },

    /// The backend returned an HTTP error.
    #[error("server error (HTTP {status}): {message}")]
    ServerError { message: String, status: u16 },

    /// The backend returned an unexpected or unparseable response envelope.
    #[error("parse error: {message}")]
    ParseError { message: String },
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::NetworkError { .. } | GenerationError::ServerError { .. }
        )
    }
}

/// Convenience alias for generation operation results.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Async trait for structured-output generative backends.
///
/// `generate_structured` must return the model's raw text verbatim; callers
/// own fence-stripping and schema validation. Implementations signal
/// withheld output via `Blocked` and a contentless success via
/// `EmptyResponse` so the caller never has to sniff sentinel strings.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Run one generation call with the given prompt, requesting JSON
    /// output, and return the raw response text.
    async fn generate_structured(&self, prompt: &str) -> GenerationResult<String>;
}
