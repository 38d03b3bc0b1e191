//! Batched embedding with bounded concurrency, plus a deterministic offline
//! provider for tests and development.
//!
//! Real providers (remote APIs, local models) live outside this crate and
//! plug in through [`EmbedProvider`]. Batch calls are preferred over
//! per-item calls; every batch is checked for the same-length contract and
//! fails rather than silently misaligning vectors to texts.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::EmbedProvider;

/// Embeds `texts` in batches of `batch_size`, keeping at most
/// `max_in_flight` provider calls outstanding. Output order matches input
/// order.
pub async fn embed_all(
    provider: &dyn EmbedProvider,
    texts: &[String],
    batch_size: usize,
    max_in_flight: usize,
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let batch_size = batch_size.max(1);
    debug!(
        texts = texts.len(),
        batch_size,
        max_in_flight,
        provider = provider.id(),
        "embedding batches"
    );
    let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(batch_size))
        .map(|batch| async move {
            let out = provider.embed_batch(batch).await?;
            if out.len() != batch.len() {
                return Err(Error::EmbeddingMismatch {
                    requested: batch.len(),
                    returned: out.len(),
                });
            }
            Ok(out)
        })
        .buffered(max_in_flight.max(1))
        .try_collect()
        .await?;
    Ok(batches.into_iter().flatten().collect())
}

/// Deterministic hash-bucket embedder: each whitespace token is hashed into
/// a bucket, the result is L2-normalized. No model weights, no network;
/// the same text always yields the same vector.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            id: format!("hash:d{dim}"),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl EmbedProvider for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// The provider used when nothing external is wired in. Deterministic and
/// offline, so tests and development never need model weights or a network.
pub fn default_provider(dim: usize) -> Box<dyn EmbedProvider> {
    Box::new(HashEmbedder::new(dim))
}
