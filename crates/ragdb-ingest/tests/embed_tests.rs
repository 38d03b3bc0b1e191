use async_trait::async_trait;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::EmbedProvider;
use ragdb_ingest::{default_provider, embed_all, HashEmbedder};

/// Provider that returns one vector fewer than requested.
struct ShortingProvider;

#[async_trait]
impl EmbedProvider for ShortingProvider {
    fn id(&self) -> &str {
        "shorting"
    }

    fn dim(&self) -> usize {
        4
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![0.0; 4]).collect())
    }
}

/// Provider that tags each vector with the index of the text it embedded,
/// so ordering bugs across concurrent batches are visible.
struct OrdinalProvider;

#[async_trait]
impl EmbedProvider for OrdinalProvider {
    fn id(&self) -> &str {
        "ordinal"
    }

    fn dim(&self) -> usize {
        1
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| vec![t.parse::<f32>().unwrap()])
            .collect())
    }
}

fn texts(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

#[tokio::test]
async fn short_batch_is_rejected() {
    let err = embed_all(&ShortingProvider, &texts(3), 8, 2)
        .await
        .expect_err("mismatched batch must fail");
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
async fn output_order_matches_input_across_batches() {
    // Small batches with several in flight; vectors must still line up with
    // their source texts.
    let out = embed_all(&OrdinalProvider, &texts(17), 3, 4)
        .await
        .expect("embed");
    assert_eq!(out.len(), 17);
    for (i, v) in out.iter().enumerate() {
        assert_eq!(v[0], i as f32);
    }
}

#[tokio::test]
async fn empty_input_is_a_no_op() {
    let out = embed_all(&OrdinalProvider, &[], 8, 2).await.expect("embed");
    assert!(out.is_empty());
}

#[tokio::test]
async fn hash_embedder_is_deterministic() {
    let embedder = HashEmbedder::new(64);
    let texts = vec!["the quick brown fox".to_string()];
    let a = embedder.embed_batch(&texts).await.expect("embed");
    let b = embedder.embed_batch(&texts).await.expect("embed");
    assert_eq!(a, b);
    assert_eq!(a[0].len(), 64);
}

#[tokio::test]
async fn hash_embedder_output_is_unit_length() {
    let embedder = HashEmbedder::new(32);
    let texts = vec!["some words to hash into buckets".to_string()];
    let out = embedder.embed_batch(&texts).await.expect("embed");
    let norm = out[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
}

#[tokio::test]
async fn distinct_texts_get_distinct_vectors() {
    let embedder = HashEmbedder::new(32);
    let texts = vec!["alpha beta".to_string(), "gamma delta".to_string()];
    let out = embedder.embed_batch(&texts).await.expect("embed");
    assert_ne!(out[0], out[1]);
}

#[tokio::test]
async fn default_provider_reports_its_dimension() {
    let provider = default_provider(128);
    assert_eq!(provider.dim(), 128);
    let out = provider
        .embed_batch(&["hello".to_string()])
        .await
        .expect("embed");
    assert_eq!(out[0].len(), 128);
}
