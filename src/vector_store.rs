//! Vector Store Abstraction
//!
//! Defines the async `VectorStore` trait over which ingest and retrieval
//! run. A store holds chunk records (id, vector, text, source metadata)
//! and answers nearest-neighbor queries by cosine similarity, most similar
//! first. Two implementations ship: an in-memory store for tests and
//! single-process deployments, and a Chroma REST client.

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::Retryable;

/// Errors from vector store operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Configuration is invalid or incomplete.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// The named collection does not exist and could not be created.
    #[error("collection '{name}' is missing")]
    CollectionMissing { name: String },

    /// A record is malformed (e.g. a vector of mismatched dimension).
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    /// A network or connection error occurred.
    #[error("network error: {message}")]
    NetworkError { message: String },

    /// The store returned an HTTP error.
    #[error("server error (HTTP {status}): {message}")]
    ServerError { message: String, status: u16 },

    /// The store returned an unexpected or unparseable response.
    #[error("parse error: {message}")]
    ParseError { message: String },
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::NetworkError { .. } | StoreError::ServerError { .. }
        )
    }
}

/// Convenience alias for store operation results.
pub type StoreResult<T> = Result<T, StoreError>;

/// One embedded chunk, ready for upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// Stable chunk identity. Re-upserting the same id overwrites the
    /// stored record instead of duplicating it.
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// The chunk's verbatim text.
    pub text: String,
    /// Source document the chunk came from.
    pub source: String,
}

/// One retrieval hit, carrying its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    /// Cosine similarity in `[-1, 1]`, higher is more similar.
    pub score: f32,
}

/// Async trait for vector collection backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Number of records currently stored in the collection.
    async fn count(&self) -> StoreResult<usize>;

    /// Insert or overwrite records by id.
    async fn upsert(&self, records: &[ChunkRecord]) -> StoreResult<()>;

    /// Return up to `top_k` records nearest to `vector`, most similar
    /// first. Fewer than `top_k` results means the collection is small,
    /// not that the query failed.
    async fn query(&self, vector: &[f32], top_k: usize) -> StoreResult<Vec<ScoredChunk>>;
}

/// Cosine similarity between two equal-length vectors.
///
/// Zero-magnitude vectors compare as 0.0 rather than dividing by zero.
/// Callers must check dimensions first; mismatched lengths are a bug here,
/// not an input condition.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
