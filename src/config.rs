//! Engine Configuration
//!
//! `CoachConfig` gathers every tunable the pipeline needs: credentials,
//! model identities, knowledge corpus location, chunking parameters, the
//! retrieval depth, timeouts and the retry policy. Configuration is built
//! once at process startup (`from_env` or literal construction), validated
//! before any backend call, and then treated as immutable.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoachError, CoachResult};

/// Default chunk window width, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Default overlap between consecutive chunk windows, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Default number of nearest-neighbor chunks retrieved per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Default vector collection name.
pub const DEFAULT_COLLECTION: &str = "insurance_coach";

/// Default knowledge corpus directory.
pub const DEFAULT_KNOWLEDGE_DIR: &str = "knowledge_files";

/// Default upsert batch size (vector backend payload limits).
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

/// Transcripts longer than this (in characters) are pre-summarized before
/// retrieval when a summarizer is configured.
pub const DEFAULT_SUMMARIZE_THRESHOLD: usize = 6000;

/// Default per-request timeout for backend HTTP calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Which deployment-variable analysis block the engine works with.
///
/// The prompt composer emits the matching output-schema block and the
/// parser requires the matching key in the model's JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStyle {
    /// `objection_handling_strategy`: predicted objection, counter strategy,
    /// example script.
    ObjectionHandling,
    /// `coverage_analysis`: three-stage coverage breakdown (current
    /// coverage, coverage gaps, recommended coverage).
    CoverageReview,
}

/// Fixed-window chunking parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Window width in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive windows. Must be strictly less than
    /// `chunk_size` or the cursor never advances.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    /// Validate the chunking parameters.
    pub fn validate(&self) -> CoachResult<()> {
        if self.chunk_size == 0 {
            return Err(CoachError::config("chunk_size must be at least 1"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(CoachError::config(format!(
                "chunk_overlap {} must be strictly less than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Retry policy for transient backend failures.
///
/// Applied to embedding, generation and vector-store calls; only errors
/// classified retryable (network, server, rate limit) are retried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt. Zero disables retry.
    pub max_retries: u32,
    /// Base backoff; attempt `n` sleeps `initial_backoff * n`.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    /// Google AI Studio API key (embedding + generation).
    pub google_api_key: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Generative model identifier.
    pub generation_model: String,
    /// Base URL override for the Gemini REST API (compat endpoints, tests).
    pub base_url: Option<String>,
    /// Chroma server URL. `None` runs the in-process vector store.
    pub chroma_url: Option<String>,
    /// Vector collection name.
    pub collection: String,
    /// Directory holding the knowledge corpus documents.
    pub knowledge_dir: PathBuf,
    /// Chunking parameters.
    pub chunk: ChunkConfig,
    /// Nearest-neighbor depth per retrieval.
    pub top_k: usize,
    /// Upsert batch size during ingest.
    pub upsert_batch_size: usize,
    /// Pre-summarization threshold in characters. `None` disables the
    /// summarization step even when a summarizer is wired.
    pub summarize_threshold: Option<usize>,
    /// Per-request timeout for backend HTTP calls.
    pub request_timeout: Duration,
    /// Retry policy for transient backend failures.
    pub retry: RetryPolicy,
    /// Deployment-variable analysis block shape.
    pub analysis_style: AnalysisStyle,
}

impl CoachConfig {
    /// Build a configuration with defaults around the given API key.
    pub fn new(google_api_key: impl Into<String>) -> Self {
        Self {
            google_api_key: google_api_key.into(),
            embedding_model: "text-embedding-004".to_string(),
            generation_model: "gemini-1.5-pro-latest".to_string(),
            base_url: None,
            chroma_url: None,
            collection: DEFAULT_COLLECTION.to_string(),
            knowledge_dir: PathBuf::from(DEFAULT_KNOWLEDGE_DIR),
            chunk: ChunkConfig::default(),
            top_k: DEFAULT_TOP_K,
            upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
            summarize_threshold: Some(DEFAULT_SUMMARIZE_THRESHOLD),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            analysis_style: AnalysisStyle::ObjectionHandling,
        }
    }

    /// Build a configuration from environment variables.
    ///
    /// `GOOGLE_API_KEY` is required. `COACH_EMBEDDING_MODEL`,
    /// `COACH_GENERATION_MODEL`, `COACH_COLLECTION`, `COACH_KNOWLEDGE_DIR`,
    /// `COACH_BASE_URL` and `COACH_CHROMA_URL` override the defaults when
    /// set.
    pub fn from_env() -> CoachResult<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| {
            CoachError::config("GOOGLE_API_KEY is not set; the engine cannot reach its backends")
        })?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("COACH_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(model) = std::env::var("COACH_GENERATION_MODEL") {
            config.generation_model = model;
        }
        if let Ok(name) = std::env::var("COACH_COLLECTION") {
            config.collection = name;
        }
        if let Ok(dir) = std::env::var("COACH_KNOWLEDGE_DIR") {
            config.knowledge_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("COACH_BASE_URL") {
            config.base_url = Some(url);
        }
        if let Ok(url) = std::env::var("COACH_CHROMA_URL") {
            config.chroma_url = Some(url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Invalid configuration is fatal: both
    /// `ensure_ready` and `analyze` must refuse to run on it.
    pub fn validate(&self) -> CoachResult<()> {
        if self.google_api_key.trim().is_empty() {
            return Err(CoachError::config("google_api_key must not be empty"));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(CoachError::config("embedding_model must not be empty"));
        }
        if self.generation_model.trim().is_empty() {
            return Err(CoachError::config("generation_model must not be empty"));
        }
        if self.collection.trim().is_empty() {
            return Err(CoachError::config("collection name must not be empty"));
        }
        if self.top_k == 0 {
            return Err(CoachError::config("top_k must be at least 1"));
        }
        if self.upsert_batch_size == 0 {
            return Err(CoachError::config("upsert_batch_size must be at least 1"));
        }
        self.chunk.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> CoachConfig {
        CoachConfig::new("test-api-key")
    }

    // =====================================================================
    // ChunkConfig tests
    // =====================================================================

    #[test]
    fn chunk_defaults_are_valid() {
        let chunk = ChunkConfig::default();
        assert_eq!(chunk.chunk_size, 2000);
        assert_eq!(chunk.chunk_overlap, 200);
        assert!(chunk.validate().is_ok());
    }

    #[test]
    fn chunk_overlap_equal_to_size_is_rejected() {
        let chunk = ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        let err = chunk.validate().unwrap_err();
        assert!(matches!(err, CoachError::Config(_)));
        assert!(err.to_string().contains("strictly less"));
    }

    #[test]
    fn chunk_overlap_greater_than_size_is_rejected() {
        let chunk = ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 150,
        };
        assert!(chunk.validate().is_err());
    }

    #[test]
    fn chunk_zero_size_is_rejected() {
        let chunk = ChunkConfig {
            chunk_size: 0,
            chunk_overlap: 0,
        };
        assert!(chunk.validate().is_err());
    }

    // =====================================================================
    // CoachConfig tests
    // =====================================================================

    #[test]
    fn new_uses_documented_defaults() {
        let config = valid_config();
        assert_eq!(config.embedding_model, "text-embedding-004");
        assert_eq!(config.generation_model, "gemini-1.5-pro-latest");
        assert_eq!(config.collection, "insurance_coach");
        assert_eq!(config.top_k, 3);
        assert_eq!(config.upsert_batch_size, 100);
        assert_eq!(config.analysis_style, AnalysisStyle::ObjectionHandling);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let config = CoachConfig::new("   ");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoachError::Config(_)));
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut config = valid_config();
        config.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = valid_config();
        config.upsert_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_chunk_params_fail_top_level_validate() {
        let mut config = valid_config();
        config.chunk.chunk_overlap = config.chunk.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn analysis_style_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&AnalysisStyle::ObjectionHandling).unwrap(),
            "\"objection_handling\""
        );
        assert_eq!(
            serde_json::to_string(&AnalysisStyle::CoverageReview).unwrap(),
            "\"coverage_review\""
        );
    }
}
