//! In-Memory Vector Store
//!
//! Brute-force cosine scan over a `HashMap`, keyed by chunk id. Fine for
//! the corpus sizes this engine handles (hundreds to low thousands of
//! chunks) and for tests; swap in the Chroma store when the index must
//! outlive the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::vector_store::{
    cosine_similarity, ChunkRecord, ScoredChunk, StoreError, StoreResult, VectorStore,
};

/// Process-local vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    records: RwLock<HashMap<String, ChunkRecord>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn count(&self) -> StoreResult<usize> {
        Ok(self.records.read().await.len())
    }

    async fn upsert(&self, records: &[ChunkRecord]) -> StoreResult<()> {
        let mut map = self.records.write().await;
        let mut expected = map.values().next().map(|r| r.vector.len());
        for record in records {
            if record.vector.is_empty() {
                return Err(StoreError::InvalidRecord {
                    message: format!("record '{}' has an empty vector", record.id),
                });
            }
            match expected {
                Some(dim) if record.vector.len() != dim => {
                    return Err(StoreError::InvalidRecord {
                        message: format!(
                            "record '{}' has dimension {}, collection holds {}",
                            record.id,
                            record.vector.len(),
                            dim
                        ),
                    });
                }
                Some(_) => {}
                None => expected = Some(record.vector.len()),
            }
        }
        for record in records {
            map.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> StoreResult<Vec<ScoredChunk>> {
        let map = self.records.read().await;
        if let Some(stored) = map.values().next().map(|r| r.vector.len()) {
            if vector.len() != stored {
                return Err(StoreError::InvalidConfig {
                    message: format!(
                        "query vector has dimension {}, collection holds {}",
                        vector.len(),
                        stored
                    ),
                });
            }
        }
        let mut scored: Vec<ScoredChunk> = map
            .values()
            .map(|record| ScoredChunk {
                id: record.id.clone(),
                text: record.text.clone(),
                score: cosine_similarity(vector, &record.vector),
            })
            .collect();
        // Descending by similarity; ties broken by id for determinism.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}
