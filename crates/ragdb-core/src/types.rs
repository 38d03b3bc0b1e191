//! Domain types shared by the ingestion loader and the store adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ChunkId = String;

// ============================================================================
// Configuration identities
// ============================================================================

/// One logical RAG pipeline: which extractor, chunker, embedder and backend
/// participate, plus an optional tag restricting which documents are indexed.
///
/// Immutable once created; identified by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub id: String,
    pub extractor_config_id: String,
    pub chunker_config_id: String,
    pub embedding_config_id: String,
    pub vector_store_config_id: String,
    pub tag_filter: Option<String>,
}

/// Backend families with a registered adapter implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// LanceDB: vector, full-text and hybrid search. The reference backend.
    Lance,
    /// Tantivy: full-text only.
    Tantivy,
    /// In-memory brute-force store: vector only. For tests and development.
    Memory,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "lance" | "lancedb" => Ok(Self::Lance),
            "tantivy" => Ok(Self::Tantivy),
            "memory" => Ok(Self::Memory),
            other => Err(Error::UnsupportedBackendType(other.to_string())),
        }
    }
}

/// Identifies one vector-store backend instance. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    pub kind: BackendKind,
    /// Connection string: a database path for Lance, an index directory for
    /// Tantivy, ignored by the memory backend.
    pub uri: String,
    pub table: String,
    /// Embedding dimensionality expected by this backend.
    pub dim: usize,
    pub metric: SimilarityMetric,
}

// ============================================================================
// Upstream artifacts
// ============================================================================

/// Extracted text for one document, stamped with the extractor config that
/// produced it. Retries can leave several per (document, config) pair; the
/// deduplicator picks the canonical one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub id: String,
    pub config_id: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    #[serde(default)]
    pub chunked_documents: Vec<ChunkedDocument>,
}

/// The chunks produced from one extraction by one chunker config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkedDocument {
    pub id: String,
    pub config_id: String,
    pub created_at: DateTime<Utc>,
    pub chunks: Vec<String>,
    #[serde(default)]
    pub chunk_embeddings: Vec<ChunkEmbeddings>,
}

/// The embedding vectors for one chunked document under one embedding config.
/// `vectors[i]` belongs to `chunks[i]` of the parent; the counts must agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEmbeddings {
    pub id: String,
    pub config_id: String,
    pub created_at: DateTime<Utc>,
    pub vectors: Vec<Vec<f32>>,
}

/// A source document with its per-config artifacts attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extractions: Vec<Extraction>,
}

impl Document {
    pub fn extractions(&self) -> &[Extraction] {
        &self.extractions
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A project groups the documents that share one indexing lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub documents: Vec<Document>,
}

impl Project {
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}

// ============================================================================
// Chunk records and search surface
// ============================================================================

/// One indexable row: a chunk of text paired with its embedding vector.
///
/// Identity is derived from `(doc_id, chunk_index)`, never from a random id,
/// so re-running the same upsert converges instead of duplicating rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub doc_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub vector: Vec<f32>,
}

impl ChunkRecord {
    pub fn chunk_id(&self) -> ChunkId {
        format!("{}:{}", self.doc_id, self.chunk_index)
    }
}

/// How vector closeness is scored. A property of the backend config,
/// not of the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    L2,
    Dot,
}

/// Which retrieval path a search should take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    FullText,
    Vector,
    Hybrid,
}

/// Indicates which engine produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Vector,
    Text,
}

/// A search against one index.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub text: String,
    /// Query embedding; required for `Vector` and `Hybrid` modes.
    pub vector: Option<Vec<f32>>,
    pub k: usize,
    pub mode: SearchMode,
}

/// The normalized hit surface returned by all backends.
///
/// `id` matches `ChunkRecord::chunk_id()`. `score` is engine-specific but
/// higher is always better. Owned by the caller of `search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub doc_id: String,
    pub chunk_index: usize,
    pub score: f32,
    pub source: SourceKind,
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4}, {:?})", self.id, self.score, self.source)
    }
}
