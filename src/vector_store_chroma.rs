//! Chroma Vector Store
//!
//! `VectorStore` implementation over the Chroma REST API (v1). The
//! collection is resolved once with `get_or_create` and its id cached in a
//! `OnceCell`, so concurrent callers share a single resolution.
//!
//! ## API Details
//!
//! - Resolve: `POST {base}/api/v1/collections` with `get_or_create: true`
//! - Count: `GET {base}/api/v1/collections/{id}/count`
//! - Upsert: `POST {base}/api/v1/collections/{id}/upsert`
//! - Query: `POST {base}/api/v1/collections/{id}/query`
//!
//! The collection is created with `hnsw:space = cosine`; query responses
//! carry cosine distances, converted here to similarities (`1 - distance`).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::http_client::build_http_client;
use crate::vector_store::{ChunkRecord, ScoredChunk, StoreError, StoreResult, VectorStore};

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChromaCollection {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChromaQueryResponse {
    ids: Vec<Vec<String>>,
    documents: Vec<Vec<Option<String>>>,
    distances: Vec<Vec<f32>>,
}

// ---------------------------------------------------------------------------
// Store implementation
// ---------------------------------------------------------------------------

/// Chroma-backed vector store.
pub struct ChromaVectorStore {
    client: reqwest::Client,
    base_url: String,
    collection_name: String,
    collection_id: OnceCell<String>,
}

impl ChromaVectorStore {
    /// Create a store for `collection_name` at `base_url`
    /// (e.g. `http://localhost:8000`).
    pub fn new(base_url: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self::with_timeout(base_url, collection_name, Duration::from_secs(60))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        collection_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: build_http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection_name: collection_name.into(),
            collection_id: OnceCell::new(),
        }
    }

    fn collections_url(&self) -> String {
        format!("{}/api/v1/collections", self.base_url)
    }

    fn collection_url(&self, id: &str, operation: &str) -> String {
        format!("{}/api/v1/collections/{}/{}", self.base_url, id, operation)
    }

    /// Resolve the collection id, creating the collection on first use.
    async fn collection_id(&self) -> StoreResult<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let body = serde_json::json!({
                    "name": self.collection_name,
                    "get_or_create": true,
                    "metadata": { "hnsw:space": "cosine" },
                });
                let response = self
                    .client
                    .post(self.collections_url())
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| self.map_reqwest_error(e))?;

                let status = response.status().as_u16();
                let text = response.text().await.map_err(|e| StoreError::NetworkError {
                    message: format!("failed to read response body: {}", e),
                })?;

                if status != 200 {
                    if status == 404 {
                        return Err(StoreError::CollectionMissing {
                            name: self.collection_name.clone(),
                        });
                    }
                    return Err(self.map_http_error(status, &text));
                }

                let collection: ChromaCollection =
                    serde_json::from_str(&text).map_err(|e| StoreError::ParseError {
                        message: format!("failed to parse collection response: {}", e),
                    })?;
                Ok(collection.id)
            })
            .await?;
        Ok(id.as_str())
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::NetworkError {
                message: format!("request to {} timed out", self.base_url),
            }
        } else if err.is_connect() {
            StoreError::NetworkError {
                message: format!("cannot connect to Chroma at {}: {}", self.base_url, err),
            }
        } else {
            StoreError::NetworkError {
                message: err.to_string(),
            }
        }
    }

    fn map_http_error(&self, status: u16, body_text: &str) -> StoreError {
        match status {
            400 | 422 => StoreError::InvalidConfig {
                message: format!("Chroma rejected the request: {}", body_text),
            },
            _ => StoreError::ServerError {
                message: body_text.to_string(),
                status,
            },
        }
    }

    async fn post_json(&self, url: String, body: &serde_json::Value) -> StoreResult<String> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| StoreError::NetworkError {
            message: format!("failed to read response body: {}", e),
        })?;

        if status == 200 || status == 201 {
            Ok(text)
        } else {
            Err(self.map_http_error(status, &text))
        }
    }

    fn build_upsert_body(records: &[ChunkRecord]) -> serde_json::Value {
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let embeddings: Vec<&[f32]> = records.iter().map(|r| r.vector.as_slice()).collect();
        let documents: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let metadatas: Vec<serde_json::Value> = records
            .iter()
            .map(|r| serde_json::json!({ "source": r.source }))
            .collect();
        serde_json::json!({
            "ids": ids,
            "embeddings": embeddings,
            "documents": documents,
            "metadatas": metadatas,
        })
    }

    fn parse_query_response(text: &str) -> StoreResult<Vec<ScoredChunk>> {
        let parsed: ChromaQueryResponse =
            serde_json::from_str(text).map_err(|e| StoreError::ParseError {
                message: format!("failed to parse query response: {}", e),
            })?;

        // One query embedding in, one result row out.
        let (Some(ids), Some(documents), Some(distances)) = (
            parsed.ids.into_iter().next(),
            parsed.documents.into_iter().next(),
            parsed.distances.into_iter().next(),
        ) else {
            return Ok(Vec::new());
        };

        if ids.len() != documents.len() || ids.len() != distances.len() {
            return Err(StoreError::ParseError {
                message: format!(
                    "query response rows disagree: {} ids, {} documents, {} distances",
                    ids.len(),
                    documents.len(),
                    distances.len()
                ),
            });
        }

        Ok(ids
            .into_iter()
            .zip(documents)
            .zip(distances)
            .map(|((id, document), distance)| ScoredChunk {
                id,
                text: document.unwrap_or_default(),
                score: 1.0 - distance,
            })
            .collect())
    }
}

#[async_trait]
impl VectorStore for ChromaVectorStore {
    async fn count(&self) -> StoreResult<usize> {
        let id = self.collection_id().await?;
        let response = self
            .client
            .get(self.collection_url(id, "count"))
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| StoreError::NetworkError {
            message: format!("failed to read response body: {}", e),
        })?;

        if status != 200 {
            return Err(self.map_http_error(status, &text));
        }
        text.trim().parse().map_err(|_| StoreError::ParseError {
            message: format!("count endpoint returned non-numeric body: {}", text),
        })
    }

    async fn upsert(&self, records: &[ChunkRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let id = self.collection_id().await?.to_string();
        let body = Self::build_upsert_body(records);
        self.post_json(self.collection_url(&id, "upsert"), &body)
            .await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> StoreResult<Vec<ScoredChunk>> {
        let id = self.collection_id().await?.to_string();
        let body = serde_json::json!({
            "query_embeddings": [vector],
            "n_results": top_k,
            "include": ["documents", "distances"],
        });
        let text = self.post_json(self.collection_url(&id, "query"), &body).await?;
        Self::parse_query_response(&text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
