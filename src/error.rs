//! Engine Error Taxonomy
//!
//! Defines `CoachError`, the error type callers of the coaching engine see.
//! Every failure terminal of an `analyze` call maps to exactly one variant,
//! and the `Display` text is the human-readable reason handed back to the
//! web layer. Per-backend error types (`EmbeddingError`, `GenerationError`,
//! `StoreError`) live next to their traits and convert into `CoachError`
//! at the engine boundary.

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::generation::GenerationError;
use crate::vector_store::StoreError;

/// Caller-facing error for `ensure_ready` and `analyze`.
///
/// None of these are fatal to the hosting process. On any variant the
/// caller's history is left untouched; `analyze` is safe to retry.
#[derive(Error, Debug)]
pub enum CoachError {
    /// Missing/invalid credentials, missing collection, or invalid chunk
    /// parameters. Fatal at startup: neither ingest nor analysis proceeds.
    #[error("configuration error: {0}")]
    Config(String),

    /// Blank transcript. Returned to the caller, not logged as a failure.
    #[error("no content to analyze")]
    EmptyInput,

    /// The generative backend withheld its output (safety filter or policy
    /// refusal), with the backend's stated reason.
    #[error("response blocked: {reason}")]
    Blocked { reason: String },

    /// The generative backend returned no usable content.
    #[error("empty response from model")]
    EmptyResponse,

    /// The model's output did not conform to the coaching result schema.
    /// `raw_excerpt` carries the head of the raw response for diagnostics.
    #[error("invalid structured output: {detail}")]
    InvalidOutput { detail: String, raw_excerpt: String },

    /// Network/timeout failure in any of the external backends. The whole
    /// `analyze` call is idempotent and may be retried.
    #[error("analysis failed: {0}")]
    Backend(String),
}

impl CoachError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Result type alias used across the crate's public surface.
pub type CoachResult<T> = Result<T, CoachError>;

impl From<EmbeddingError> for CoachError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::InvalidConfig { message }
            | EmbeddingError::AuthenticationFailed { message } => CoachError::Config(message),
            other => CoachError::Backend(other.to_string()),
        }
    }
}

impl From<GenerationError> for CoachError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::InvalidConfig { message }
            | GenerationError::AuthenticationFailed { message } => CoachError::Config(message),
            GenerationError::Blocked { reason } => CoachError::Blocked { reason },
            GenerationError::EmptyResponse => CoachError::EmptyResponse,
            other => CoachError::Backend(other.to_string()),
        }
    }
}

impl From<StoreError> for CoachError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidConfig { message } => CoachError::Config(message),
            StoreError::CollectionMissing { name } => {
                CoachError::Config(format!("collection '{}' does not exist", name))
            }
            other => CoachError::Backend(other.to_string()),
        }
    }
}
