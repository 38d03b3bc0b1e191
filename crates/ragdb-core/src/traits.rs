//! Capability interfaces implemented by the store and embedding layers.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChunkRecord, SearchHit, SearchRequest, SimilarityMetric};

/// Polymorphic interface over vector-store backend families.
///
/// An adapter owns one index/table in one backend instance: its lifecycle
/// (`create_index`), writes (`upsert_chunks`) and reads (`search`), plus
/// housekeeping. Implementations must be safe for concurrent upserts and
/// searches, serializing internally where the backend requires it.
///
/// Failure semantics: backend call failures propagate as typed errors
/// carrying the backend id and operation; adapters never retry on their own.
#[async_trait]
pub trait VectorStoreAdapter: Send + Sync {
    /// The backend config id this adapter was built from.
    fn backend_id(&self) -> &str;

    /// The similarity metric this index scores vectors under.
    fn metric(&self) -> SimilarityMetric;

    /// Create the backend-side structure for this index. Safe to call once
    /// per config; each implementation documents whether a repeated call
    /// no-ops or fails.
    async fn create_index(&self) -> Result<()>;

    /// Idempotent write: re-running with the same records converges to the
    /// same stored state. Records for one document are written in
    /// chunk-index order within a batch; no ordering holds across documents
    /// or across concurrent batches.
    async fn upsert_chunks(&self, records: &[ChunkRecord]) -> Result<()>;

    /// Returns up to `k` hits ordered by descending relevance. Modes a
    /// backend family does not implement fail with `UnsupportedSearchMode`.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;

    async fn count_records(&self) -> Result<usize>;

    /// Backend-specific maintenance (e.g. rebuilding a stale full-text
    /// index). Never required for correctness of subsequent searches.
    async fn optimize(&self) -> Result<()>;

    /// Releases backend connections. Safe to call multiple times; operations
    /// after close fail with `BackendUnavailable`.
    async fn close(&self) -> Result<()>;
}

impl std::fmt::Debug for dyn VectorStoreAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStoreAdapter")
            .field("backend_id", &self.backend_id())
            .finish()
    }
}

/// Batch embedding provider. The vector count must equal the text count;
/// callers treat any other shape as a hard error.
#[async_trait]
pub trait EmbedProvider: Send + Sync {
    /// Stable identifier for the provider/model.
    fn id(&self) -> &str;

    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
