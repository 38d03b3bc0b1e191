//! In-memory brute-force adapter, vector mode only.
//!
//! Backs tests and development runs where spinning up a real engine is
//! overkill. Scoring scans every stored vector, so keep row counts small.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::VectorStoreAdapter;
use ragdb_core::types::{
    BackendConfig, ChunkId, ChunkRecord, SearchHit, SearchMode, SearchRequest, SimilarityMetric,
    SourceKind,
};

struct StoredChunk {
    doc_id: String,
    chunk_index: usize,
    vector: Vec<f32>,
}

pub struct MemoryAdapter {
    config: BackendConfig,
    // None after close.
    rows: RwLock<Option<HashMap<ChunkId, StoredChunk>>>,
}

impl MemoryAdapter {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            rows: RwLock::new(Some(HashMap::new())),
        }
    }

    fn score(&self, query: &[f32], stored: &[f32]) -> f32 {
        let dot: f32 = query.iter().zip(stored).map(|(a, b)| a * b).sum();
        match self.config.metric {
            SimilarityMetric::Dot => dot,
            SimilarityMetric::Cosine => {
                let qn = query.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
                let sn = stored.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
                dot / (qn * sn)
            }
            SimilarityMetric::L2 => {
                let dist: f32 = query
                    .iter()
                    .zip(stored)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>()
                    .sqrt();
                -dist
            }
        }
    }
}

#[async_trait]
impl VectorStoreAdapter for MemoryAdapter {
    fn backend_id(&self) -> &str {
        &self.config.id
    }

    fn metric(&self) -> SimilarityMetric {
        self.config.metric
    }

    async fn create_index(&self) -> Result<()> {
        if self.rows.read().await.is_none() {
            return Err(Error::backend(&self.config.id, "create_index", "adapter is closed"));
        }
        Ok(())
    }

    async fn upsert_chunks(&self, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut guard = self.rows.write().await;
        let rows = guard
            .as_mut()
            .ok_or_else(|| Error::backend(&self.config.id, "upsert", "adapter is closed"))?;
        for record in records {
            if record.vector.len() != self.config.dim {
                return Err(Error::EmbeddingMismatch {
                    requested: self.config.dim,
                    returned: record.vector.len(),
                });
            }
            rows.insert(
                record.chunk_id(),
                StoredChunk {
                    doc_id: record.doc_id.clone(),
                    chunk_index: record.chunk_index,
                    vector: record.vector.clone(),
                },
            );
        }
        debug!(backend_id = %self.config.id, records = records.len(), "upserted chunks");
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        if request.mode != SearchMode::Vector {
            return Err(Error::UnsupportedSearchMode {
                backend_id: self.config.id.clone(),
                mode: request.mode,
            });
        }
        let query = request
            .vector
            .as_ref()
            .ok_or_else(|| Error::InvalidQuery("vector search requires a query embedding".into()))?;
        if query.len() != self.config.dim {
            return Err(Error::InvalidQuery(format!(
                "query embedding has {} dimensions, backend expects {}",
                query.len(),
                self.config.dim
            )));
        }

        let guard = self.rows.read().await;
        let rows = guard
            .as_ref()
            .ok_or_else(|| Error::backend(&self.config.id, "search", "adapter is closed"))?;
        let mut hits: Vec<SearchHit> = rows
            .iter()
            .map(|(id, stored)| SearchHit {
                id: id.clone(),
                doc_id: stored.doc_id.clone(),
                chunk_index: stored.chunk_index,
                score: self.score(query, &stored.vector),
                source: SourceKind::Vector,
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(request.k);
        Ok(hits)
    }

    async fn count_records(&self) -> Result<usize> {
        let guard = self.rows.read().await;
        let rows = guard
            .as_ref()
            .ok_or_else(|| Error::backend(&self.config.id, "count", "adapter is closed"))?;
        Ok(rows.len())
    }

    async fn optimize(&self) -> Result<()> {
        if self.rows.read().await.is_none() {
            return Err(Error::backend(&self.config.id, "optimize", "adapter is closed"));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.rows.write().await;
        if guard.take().is_some() {
            debug!(backend_id = %self.config.id, "closed memory store");
        }
        Ok(())
    }
}
