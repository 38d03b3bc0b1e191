use tempfile::TempDir;

use ragdb_core::error::Error;
use ragdb_core::traits::VectorStoreAdapter;
use ragdb_core::types::{
    BackendConfig, BackendKind, ChunkRecord, SearchMode, SearchRequest, SimilarityMetric,
};
use ragdb_store::LanceAdapter;

const DIM: usize = 8;

fn backend(dir: &TempDir) -> BackendConfig {
    BackendConfig {
        id: "lance-1".to_string(),
        kind: BackendKind::Lance,
        uri: dir.path().to_string_lossy().to_string(),
        table: "chunks".to_string(),
        dim: DIM,
        metric: SimilarityMetric::Cosine,
    }
}

fn axis_vector(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[axis % DIM] = 1.0;
    v
}

fn record(doc_id: &str, chunk_index: usize, text: &str, vector: Vec<f32>) -> ChunkRecord {
    ChunkRecord {
        doc_id: doc_id.to_string(),
        chunk_index,
        text: text.to_string(),
        vector,
    }
}

async fn open_store(dir: &TempDir) -> LanceAdapter {
    let store = LanceAdapter::open(backend(dir)).await.expect("open");
    store.create_index().await.expect("create_index");
    store
}

#[tokio::test]
async fn create_index_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;
    store.create_index().await.expect("second create_index");
    assert_eq!(store.count_records().await.expect("count"), 0);
}

#[tokio::test]
async fn replaying_an_upsert_converges() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;

    let records = vec![
        record("doc-1", 0, "solar panel wiring", axis_vector(0)),
        record("doc-1", 1, "battery bank sizing", axis_vector(1)),
        record("doc-2", 0, "rainwater first flush", axis_vector(2)),
    ];
    store.upsert_chunks(&records).await.expect("first upsert");
    store.upsert_chunks(&records).await.expect("second upsert");

    assert_eq!(store.count_records().await.expect("count"), 3);
}

#[tokio::test]
async fn vector_search_finds_the_seeded_row() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;

    store
        .upsert_chunks(&[
            record("doc-1", 0, "alpha", axis_vector(0)),
            record("doc-1", 1, "beta", axis_vector(1)),
            record("doc-2", 0, "gamma", axis_vector(2)),
        ])
        .await
        .expect("upsert");

    let request = SearchRequest {
        text: String::new(),
        vector: Some(axis_vector(1)),
        k: 2,
        mode: SearchMode::Vector,
    };
    let hits = store.search(&request).await.expect("search");
    assert!(!hits.is_empty());
    assert_eq!(hits[0].id, "doc-1:1");
    assert_eq!(hits[0].doc_id, "doc-1");
    assert_eq!(hits[0].chunk_index, 1);
    assert!(hits.len() <= 2);
}

#[tokio::test]
async fn full_text_search_sees_rows_written_after_index_creation() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;

    store
        .upsert_chunks(&[
            record("doc-1", 0, "wood stove installation and clearances", axis_vector(0)),
            record("doc-2", 0, "goat fencing height requirements", axis_vector(1)),
        ])
        .await
        .expect("upsert");

    // The write marked the FTS index stale; the query triggers the rebuild.
    let request = SearchRequest {
        text: "fencing".to_string(),
        vector: None,
        k: 5,
        mode: SearchMode::FullText,
    };
    let hits = store.search(&request).await.expect("search");
    assert!(!hits.is_empty());
    assert_eq!(hits[0].doc_id, "doc-2");
}

#[tokio::test]
async fn hybrid_search_returns_hits() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;

    store
        .upsert_chunks(&[
            record("doc-1", 0, "solar charge controller settings", axis_vector(0)),
            record("doc-2", 0, "root cellar ventilation", axis_vector(1)),
        ])
        .await
        .expect("upsert");

    let request = SearchRequest {
        text: "solar controller".to_string(),
        vector: Some(axis_vector(0)),
        k: 5,
        mode: SearchMode::Hybrid,
    };
    let hits = store.search(&request).await.expect("search");
    assert!(!hits.is_empty());
    assert_eq!(hits[0].doc_id, "doc-1");
}

#[tokio::test]
async fn vector_search_without_embedding_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;

    let request = SearchRequest {
        text: String::new(),
        vector: None,
        k: 5,
        mode: SearchMode::Vector,
    };
    let err = store.search(&request).await.expect_err("no embedding");
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[tokio::test]
async fn wrong_record_dimension_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;

    let err = store
        .upsert_chunks(&[record("doc-1", 0, "short vector", vec![1.0, 0.0])])
        .await
        .expect_err("dim mismatch");
    assert!(matches!(err, Error::EmbeddingMismatch { .. }));
}

#[tokio::test]
async fn close_blocks_further_operations() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir).await;

    store.close().await.expect("close");
    store.close().await.expect("second close");

    let err = store.count_records().await.expect_err("closed");
    assert!(matches!(err, Error::BackendUnavailable { .. }));
}
