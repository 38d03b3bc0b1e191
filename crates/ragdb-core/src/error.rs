use thiserror::Error;

use crate::types::SearchMode;

/// Error taxonomy shared by the ingestion and store layers.
///
/// Every variant carries enough identifying context (config ids, document
/// ids, operation names) for the caller to diagnose the failure without
/// inspecting internal state. Neither the adapters nor the registry retry
/// on their own; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced config id cannot be resolved. Fatal, no retry.
    #[error("{kind} config not found: {id}")]
    ConfigNotFound { kind: &'static str, id: String },

    /// Chunk count and embedding count disagree for a document. The whole
    /// ingestion run is aborted so the index is never silently incomplete.
    #[error("artifact mismatch for document '{doc_id}': {chunks} chunks but {embeddings} embedding vectors")]
    ArtifactMismatch {
        doc_id: String,
        chunks: usize,
        embeddings: usize,
    },

    /// Transport or connection failure talking to a backend.
    #[error("backend '{backend_id}' unavailable during {op}: {message}")]
    BackendUnavailable {
        backend_id: String,
        op: &'static str,
        message: String,
    },

    /// No adapter implementation is registered for this backend type.
    #[error("unsupported backend type: {0}")]
    UnsupportedBackendType(String),

    /// The backend family does not implement the requested search mode.
    #[error("backend '{backend_id}' does not support {mode:?} search")]
    UnsupportedSearchMode {
        backend_id: String,
        mode: SearchMode,
    },

    /// Adapter construction failed. Never cached; safe to retry.
    #[error("adapter construction failed for '{key}': {message}")]
    ConstructionFailure { key: String, message: String },

    /// The embedding provider returned a different number of vectors than
    /// texts requested. Failing beats silently misaligning vectors to texts.
    #[error("embedding provider returned {returned} vectors for {requested} texts")]
    EmbeddingMismatch { requested: usize, returned: usize },

    /// The search request is malformed for the requested mode, for example
    /// a vector query without a query embedding.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wraps a backend driver error with the backend id and the operation
    /// that was in flight.
    pub fn backend(
        backend_id: impl Into<String>,
        op: &'static str,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::BackendUnavailable {
            backend_id: backend_id.into(),
            op,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
