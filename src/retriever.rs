//! Knowledge Retrieval
//!
//! The query half of the RAG loop: embed the consultation text, ask the
//! vector store for the nearest chunks, hand back their texts most-similar
//! first. A blank query short-circuits to no results without touching
//! either backend.

use std::sync::Arc;

use tracing::debug;

use crate::config::RetryPolicy;
use crate::embedding::EmbeddingProvider;
use crate::error::CoachResult;
use crate::retry::with_retry;
use crate::vector_store::VectorStore;

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
    retry: RetryPolicy,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k,
            retry,
        }
    }

    /// Retrieve the texts of the chunks nearest to `query`.
    ///
    /// Blank input returns no results without any backend call. Empty chunk
    /// texts are dropped; the caller renders a placeholder when nothing
    /// comes back.
    pub async fn retrieve(&self, query: &str) -> CoachResult<Vec<String>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = with_retry(&self.retry, "embed retrieval query", || {
            self.embedder.embed_query(query)
        })
        .await?;

        let hits = with_retry(&self.retry, "vector store query", || {
            self.store.query(&vector, self.top_k)
        })
        .await?;

        debug!(hits = hits.len(), top_k = self.top_k, "retrieval complete");

        Ok(hits
            .into_iter()
            .filter(|hit| !hit.text.trim().is_empty())
            .map(|hit| hit.text)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::embedding::{EmbeddingError, EmbeddingResult};
    use crate::vector_store::{ChunkRecord, ScoredChunk, StoreResult};
    use crate::vector_store_memory::MemoryVectorStore;

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(documents.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn max_batch_size(&self) -> usize {
            100
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed_documents(&self, _documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            Err(EmbeddingError::AuthenticationFailed {
                message: "bad key".to_string(),
            })
        }

        fn dimension(&self) -> usize {
            2
        }

        fn max_batch_size(&self) -> usize {
            100
        }
    }

    async fn seeded_store() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(&[
                ChunkRecord {
                    id: "near".to_string(),
                    vector: vec![1.0, 0.0],
                    text: "nearest chunk".to_string(),
                    source: "guide.txt".to_string(),
                },
                ChunkRecord {
                    id: "far".to_string(),
                    vector: vec![0.0, 1.0],
                    text: "farther chunk".to_string(),
                    source: "guide.txt".to_string(),
                },
                ChunkRecord {
                    id: "blank".to_string(),
                    vector: vec![0.9, 0.1],
                    text: "   ".to_string(),
                    source: "guide.txt".to_string(),
                },
            ])
            .await
            .unwrap();
        store
    }

    fn retriever(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Retriever {
        Retriever::new(embedder, store, top_k, RetryPolicy::default())
    }

    #[tokio::test]
    async fn blank_query_makes_no_backend_calls() {
        let embedder = CountingEmbedder::new();
        let store = seeded_store().await;
        let r = retriever(embedder.clone(), store, 3);
        let results = r.retrieve("   \n  ").await.unwrap();
        assert!(results.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retrieve_returns_nearest_texts_first() {
        let r = retriever(CountingEmbedder::new(), seeded_store().await, 3);
        let results = r.retrieve("premium question").await.unwrap();
        assert_eq!(results, vec!["nearest chunk", "farther chunk"]);
    }

    #[tokio::test]
    async fn blank_chunk_texts_are_dropped() {
        let r = retriever(CountingEmbedder::new(), seeded_store().await, 3);
        let results = r.retrieve("anything").await.unwrap();
        assert!(results.iter().all(|t| !t.trim().is_empty()));
    }

    #[tokio::test]
    async fn top_k_limits_results() {
        let r = retriever(CountingEmbedder::new(), seeded_store().await, 1);
        let results = r.retrieve("anything").await.unwrap();
        assert_eq!(results, vec!["nearest chunk"]);
    }

    #[tokio::test]
    async fn embedder_failure_surfaces_as_coach_error() {
        let r = retriever(Arc::new(FailingEmbedder), seeded_store().await, 3);
        let err = r.retrieve("anything").await.unwrap_err();
        assert!(matches!(err, crate::error::CoachError::Config(_)));
    }
}
