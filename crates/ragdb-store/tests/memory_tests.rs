use ragdb_core::error::Error;
use ragdb_core::traits::VectorStoreAdapter;
use ragdb_core::types::{
    BackendConfig, BackendKind, ChunkRecord, SearchMode, SearchRequest, SimilarityMetric,
};
use ragdb_store::MemoryAdapter;

fn backend(metric: SimilarityMetric) -> BackendConfig {
    BackendConfig {
        id: "mem-1".to_string(),
        kind: BackendKind::Memory,
        uri: String::new(),
        table: "chunks".to_string(),
        dim: 3,
        metric,
    }
}

fn record(doc_id: &str, chunk_index: usize, vector: Vec<f32>) -> ChunkRecord {
    ChunkRecord {
        doc_id: doc_id.to_string(),
        chunk_index,
        text: format!("chunk {chunk_index} of {doc_id}"),
        vector,
    }
}

fn vector_request(vector: Vec<f32>, k: usize) -> SearchRequest {
    SearchRequest {
        text: String::new(),
        vector: Some(vector),
        k,
        mode: SearchMode::Vector,
    }
}

#[tokio::test]
async fn replaying_an_upsert_converges() {
    let store = MemoryAdapter::new(backend(SimilarityMetric::Cosine));
    store.create_index().await.expect("create_index");

    let records = vec![
        record("doc-1", 0, vec![1.0, 0.0, 0.0]),
        record("doc-1", 1, vec![0.0, 1.0, 0.0]),
    ];
    store.upsert_chunks(&records).await.expect("first upsert");
    store.upsert_chunks(&records).await.expect("second upsert");

    assert_eq!(store.count_records().await.expect("count"), 2);
}

#[tokio::test]
async fn cosine_search_ranks_by_similarity() {
    let store = MemoryAdapter::new(backend(SimilarityMetric::Cosine));
    store
        .upsert_chunks(&[
            record("doc-1", 0, vec![1.0, 0.0, 0.0]),
            record("doc-1", 1, vec![0.0, 1.0, 0.0]),
            record("doc-2", 0, vec![0.9, 0.1, 0.0]),
        ])
        .await
        .expect("upsert");

    let hits = store
        .search(&vector_request(vec![1.0, 0.0, 0.0], 2))
        .await
        .expect("search");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "doc-1:0");
    assert_eq!(hits[1].id, "doc-2:0");
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn k_caps_the_hit_list_over_a_larger_index() {
    let store = MemoryAdapter::new(backend(SimilarityMetric::Cosine));
    let records: Vec<ChunkRecord> = (0..10)
        .map(|i| {
            let spread = i as f32 / 10.0;
            record("doc-1", i, vec![1.0 - spread, spread, 0.1])
        })
        .collect();
    store.upsert_chunks(&records).await.expect("upsert");
    assert_eq!(store.count_records().await.expect("count"), 10);

    let hits = store
        .search(&vector_request(vec![1.0, 0.0, 0.0], 5))
        .await
        .expect("search");

    assert_eq!(hits.len(), 5);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(hits[0].id, "doc-1:0");
}

#[tokio::test]
async fn l2_search_prefers_the_nearest_point() {
    let store = MemoryAdapter::new(backend(SimilarityMetric::L2));
    store
        .upsert_chunks(&[
            record("near", 0, vec![1.0, 1.0, 1.0]),
            record("far", 0, vec![5.0, 5.0, 5.0]),
        ])
        .await
        .expect("upsert");

    let hits = store
        .search(&vector_request(vec![1.1, 1.0, 1.0], 2))
        .await
        .expect("search");

    assert_eq!(hits[0].doc_id, "near");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn text_modes_are_refused() {
    let store = MemoryAdapter::new(backend(SimilarityMetric::Cosine));
    for mode in [SearchMode::FullText, SearchMode::Hybrid] {
        let request = SearchRequest {
            text: "query".to_string(),
            vector: Some(vec![1.0, 0.0, 0.0]),
            k: 5,
            mode,
        };
        let err = store.search(&request).await.expect_err("unsupported mode");
        match err {
            Error::UnsupportedSearchMode {
                backend_id,
                mode: reported,
            } => {
                assert_eq!(backend_id, "mem-1");
                assert_eq!(reported, mode);
            }
            other => panic!("expected UnsupportedSearchMode, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn missing_query_embedding_is_rejected() {
    let store = MemoryAdapter::new(backend(SimilarityMetric::Cosine));
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
    let store = MemoryAdapter::new(backend(SimilarityMetric::Cosine));
    let err = store
        .upsert_chunks(&[record("doc-1", 0, vec![1.0, 0.0])])
        .await
        .expect_err("dim mismatch");
    match err {
        Error::EmbeddingMismatch {
            requested,
            returned,
        } => {
            assert_eq!(requested, 3);
            assert_eq!(returned, 2);
        }
        other => panic!("expected EmbeddingMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn close_is_repeat_safe_and_final() {
    let store = MemoryAdapter::new(backend(SimilarityMetric::Cosine));
    store
        .upsert_chunks(&[record("doc-1", 0, vec![1.0, 0.0, 0.0])])
        .await
        .expect("upsert");

    store.close().await.expect("close");
    store.close().await.expect("second close");

    let err = store.count_records().await.expect_err("closed");
    assert!(matches!(err, Error::BackendUnavailable { .. }));
    let err = store
        .upsert_chunks(&[record("doc-1", 1, vec![0.0, 1.0, 0.0])])
        .await
        .expect_err("closed");
    assert!(matches!(err, Error::BackendUnavailable { .. }));
}
