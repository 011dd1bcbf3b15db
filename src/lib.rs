//! # insurance-coach
//!
//! Retrieval-augmented coaching engine for live insurance consultations.
//! A transcript goes in; a structured coaching result comes out, grounded
//! in a chunked and embedded expert-knowledge corpus.
//!
//! The pipeline: the knowledge corpus is split into overlapping windows,
//! embedded and upserted into a vector collection once ([`CoachEngine::ensure_ready`]);
//! each [`CoachEngine::analyze`] call embeds the transcript, retrieves the
//! nearest chunks, composes a fixed persona/rules/schema prompt and parses
//! the model's JSON strictly into a [`CoachingResult`]. Conversation
//! history is append-only and owned by the caller.
//!
//! ## Quick start
//!
//! ```no_run
//! use insurance_coach::{CoachConfig, CoachEngine};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CoachEngine::new(CoachConfig::from_env()?)?;
//! engine.ensure_ready().await?;
//!
//! let mut history = Vec::new();
//! let analysis = engine
//!     .analyze("Customer: how much would this cost per month?", &history)
//!     .await?;
//! println!("{}", analysis.result.next_step_strategy);
//! history = analysis.history;
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod embedding_gemini;
pub mod engine;
pub mod error;
pub mod generation;
pub mod generation_gemini;
pub mod http_client;
pub mod knowledge;
pub mod prompt;
pub mod retriever;
pub mod retry;
pub mod schema;
pub mod summarizer;
pub mod vector_store;
pub mod vector_store_chroma;
pub mod vector_store_memory;

pub use config::{AnalysisStyle, ChunkConfig, CoachConfig, RetryPolicy};
pub use embedding::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
pub use embedding_gemini::GeminiEmbeddingProvider;
pub use engine::{Analysis, CoachEngine};
pub use error::{CoachError, CoachResult};
pub use generation::{GenerationError, GenerationProvider, GenerationResult};
pub use generation_gemini::GeminiGenerativeProvider;
pub use retriever::Retriever;
pub use retry::Retryable;
pub use schema::{
    AnalysisBlock, CoachingResult, CoverageReview, ObjectionHandling, RecommendedAction,
    FALLBACK_PHRASE,
};
pub use summarizer::{ProviderSummarizer, Summarizer};
pub use vector_store::{ChunkRecord, ScoredChunk, StoreError, StoreResult, VectorStore};
pub use vector_store_chroma::ChromaVectorStore;
pub use vector_store_memory::MemoryVectorStore;
