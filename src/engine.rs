//! Coaching Engine
//!
//! The orchestration core: owns the providers, runs ingest-if-empty, and
//! drives one `analyze` call through retrieval, prompt composition,
//! generation and strict parsing. The engine is stateless with respect to
//! conversations; callers own their history and receive the appended copy
//! back on success. On any failure the caller's history is untouched, so
//! a failed turn is invisible to the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::CoachConfig;
use crate::embedding::EmbeddingProvider;
use crate::embedding_gemini::GeminiEmbeddingProvider;
use crate::error::{CoachError, CoachResult};
use crate::generation::GenerationProvider;
use crate::generation_gemini::GeminiGenerativeProvider;
use crate::knowledge::{load_corpus, prepare_chunks};
use crate::prompt::PromptComposer;
use crate::retriever::Retriever;
use crate::retry::with_retry;
use crate::schema::{parse_coaching_result, CoachingResult};
use crate::summarizer::{ProviderSummarizer, Summarizer};
use crate::vector_store::{ChunkRecord, VectorStore};
use crate::vector_store_chroma::ChromaVectorStore;
use crate::vector_store_memory::MemoryVectorStore;

/// Marker line opening a raw-transcript history entry.
pub const CONSULTATION_MARKER: &str = "---consultation---";

/// Marker line opening a coaching-summary history entry.
pub const SUMMARY_MARKER: &str = "---coaching summary---";

/// One successful analysis: the parsed result plus the caller's history
/// with this turn's two entries appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: CoachingResult,
    pub history: Vec<String>,
}

/// The coaching engine. One instance serves concurrent callers.
pub struct CoachEngine {
    config: CoachConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    store: Arc<dyn VectorStore>,
    summarizer: Option<Arc<dyn Summarizer>>,
    retriever: Retriever,
    composer: PromptComposer,
    // Serializes ingest-if-empty; `ready` lets later calls skip the lock.
    ingest_lock: Mutex<()>,
    ready: AtomicBool,
}

impl CoachEngine {
    /// Build an engine with the default backends: Gemini embedding and
    /// generation, Chroma when `chroma_url` is set, the in-process store
    /// otherwise.
    pub fn new(config: CoachConfig) -> CoachResult<Self> {
        config.validate()?;

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(GeminiEmbeddingProvider::new(&config));
        let generator: Arc<dyn GenerationProvider> =
            Arc::new(GeminiGenerativeProvider::new(&config));
        let store: Arc<dyn VectorStore> = match &config.chroma_url {
            Some(url) => Arc::new(ChromaVectorStore::with_timeout(
                url.clone(),
                config.collection.clone(),
                config.request_timeout,
            )),
            None => Arc::new(MemoryVectorStore::new()),
        };
        let summarizer: Option<Arc<dyn Summarizer>> =
            Some(Arc::new(ProviderSummarizer::new(generator.clone())));

        Self::with_components(config, embedder, generator, store, summarizer)
    }

    /// Build an engine over explicit backends.
    pub fn with_components(
        config: CoachConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        store: Arc<dyn VectorStore>,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> CoachResult<Self> {
        config.validate()?;
        let retriever = Retriever::new(
            embedder.clone(),
            store.clone(),
            config.top_k,
            config.retry,
        );
        let composer = PromptComposer::new(config.analysis_style);
        Ok(Self {
            config,
            embedder,
            generator,
            store,
            summarizer,
            retriever,
            composer,
            ingest_lock: Mutex::new(()),
            ready: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Ingest
    // -----------------------------------------------------------------------

    /// Make sure the vector collection is populated.
    ///
    /// Ingest runs only when the collection is empty; a non-empty
    /// collection is taken as already ingested, so restarting the process
    /// never duplicates records. Concurrent callers serialize on one lock
    /// and only the first does the work.
    pub async fn ensure_ready(&self) -> CoachResult<()> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let _guard = self.ingest_lock.lock().await;
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let count = with_retry(&self.config.retry, "vector store count", || {
            self.store.count()
        })
        .await?;

        if count == 0 {
            self.ingest().await?;
        } else {
            debug!(count, collection = %self.config.collection, "collection already populated");
        }

        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Embed and upsert the whole knowledge corpus.
    ///
    /// Every chunk is embedded before the first upsert, so an embedding
    /// failure leaves the collection exactly as it was and the next
    /// `ensure_ready` starts over cleanly.
    async fn ingest(&self) -> CoachResult<()> {
        let documents = load_corpus(&self.config.knowledge_dir)?;
        let chunks = prepare_chunks(&documents, &self.config.chunk);
        if chunks.is_empty() {
            info!(
                dir = %self.config.knowledge_dir.display(),
                "knowledge corpus is empty, nothing to ingest"
            );
            return Ok(());
        }

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            collection = %self.config.collection,
            "ingesting knowledge corpus"
        );

        let embed_batch = self
            .embedder
            .max_batch_size()
            .min(self.config.upsert_batch_size)
            .max(1);

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(embed_batch) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let batch_vectors = with_retry(&self.config.retry, "embed corpus batch", || {
                self.embedder.embed_documents(&texts)
            })
            .await?;
            if batch_vectors.len() != texts.len() {
                return Err(CoachError::backend(format!(
                    "embedding batch returned {} vectors for {} chunks",
                    batch_vectors.len(),
                    texts.len()
                )));
            }
            vectors.extend(batch_vectors);
        }

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkRecord {
                id: chunk.id,
                vector,
                text: chunk.text,
                source: chunk.source,
            })
            .collect();

        for batch in records.chunks(self.config.upsert_batch_size) {
            with_retry(&self.config.retry, "upsert corpus batch", || {
                self.store.upsert(batch)
            })
            .await?;
        }

        info!(records = records.len(), "ingest complete");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Analysis
    // -----------------------------------------------------------------------

    /// Run one coaching analysis over `transcript` with the caller's prior
    /// `history`.
    ///
    /// On success the returned history is the input history plus two
    /// entries: the raw transcript and a one-line intent/sentiment summary
    /// of this turn's result.
    pub async fn analyze(&self, transcript: &str, history: &[String]) -> CoachResult<Analysis> {
        if transcript.trim().is_empty() {
            return Err(CoachError::EmptyInput);
        }

        self.ensure_ready().await?;

        let query = self.retrieval_query(transcript).await;
        let knowledge = self.retriever.retrieve(&query).await?;
        let prompt = self.composer.compose(transcript, history, &knowledge);

        let raw = with_retry(&self.config.retry, "generate coaching result", || {
            self.generator.generate_structured(&prompt)
        })
        .await?;

        let result = parse_coaching_result(&raw, self.config.analysis_style)?;

        let mut updated = history.to_vec();
        updated.push(consultation_entry(transcript));
        updated.push(summary_entry(&result));

        debug!(
            knowledge_chunks = knowledge.len(),
            history_len = updated.len(),
            "analysis complete"
        );

        Ok(Analysis {
            result,
            history: updated,
        })
    }

    /// Pick the retrieval query text: the raw transcript, or a condensed
    /// summary when the transcript is over the threshold and a summarizer
    /// is wired. Summarization failure degrades to the raw transcript.
    async fn retrieval_query(&self, transcript: &str) -> String {
        let Some(threshold) = self.config.summarize_threshold else {
            return transcript.to_string();
        };
        if transcript.chars().count() <= threshold {
            return transcript.to_string();
        }
        let Some(summarizer) = &self.summarizer else {
            return transcript.to_string();
        };

        match summarizer.summarize(transcript).await {
            Ok(summary) => {
                debug!(
                    transcript_chars = transcript.chars().count(),
                    summary_chars = summary.chars().count(),
                    "transcript summarized for retrieval"
                );
                summary
            }
            Err(err) => {
                warn!(error = %err, "transcript summarization failed, using raw transcript");
                transcript.to_string()
            }
        }
    }
}

/// History entry recording the caller's raw transcript.
pub fn consultation_entry(transcript: &str) -> String {
    format!("{}\n{}", CONSULTATION_MARKER, transcript)
}

/// History entry recording the headline of this turn's result.
pub fn summary_entry(result: &CoachingResult) -> String {
    format!(
        "{}\nintent: {}, sentiment: {}",
        SUMMARY_MARKER, result.customer_intent, result.customer_sentiment
    )
}
