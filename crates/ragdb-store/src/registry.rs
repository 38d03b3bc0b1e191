//! Registry of live adapter instances, keyed by (indexing config, backend
//! config) pair.
//!
//! One adapter instance serves all callers of a key. Construction runs at
//! most once at a time per key behind a per-key lock; callers of other keys
//! are never blocked. A failed construction is reported and forgotten, so
//! the next caller retries from scratch. The per-key lock is held through an
//! RAII guard, which releases it even when the constructing task is
//! cancelled mid-build.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::VectorStoreAdapter;
use ragdb_core::types::{BackendConfig, BackendKind, IndexingConfig};

use crate::{LanceAdapter, MemoryAdapter, TantivyAdapter};

/// Builds adapter instances. Injectable so tests can count constructions or
/// force failures.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn build(
        &self,
        indexing: &IndexingConfig,
        backend: &BackendConfig,
    ) -> Result<Arc<dyn VectorStoreAdapter>>;
}

/// The production factory: dispatches on the backend kind and prepares the
/// index before handing the adapter out.
pub struct BackendAdapterFactory;

#[async_trait]
impl AdapterFactory for BackendAdapterFactory {
    async fn build(
        &self,
        _indexing: &IndexingConfig,
        backend: &BackendConfig,
    ) -> Result<Arc<dyn VectorStoreAdapter>> {
        let adapter: Arc<dyn VectorStoreAdapter> = match backend.kind {
            BackendKind::Lance => Arc::new(LanceAdapter::open(backend.clone()).await?),
            BackendKind::Tantivy => Arc::new(TantivyAdapter::open(backend.clone())?),
            BackendKind::Memory => Arc::new(MemoryAdapter::new(backend.clone())),
        };
        adapter.create_index().await?;
        Ok(adapter)
    }
}

pub struct AdapterRegistry {
    factory: Arc<dyn AdapterFactory>,
    ready: RwLock<HashMap<String, Arc<dyn VectorStoreAdapter>>>,
    // Lazily populated, one lock per key. Entries are never removed; the
    // map grows with the number of distinct keys, which is small.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AdapterRegistry {
    pub fn new(factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            factory,
            ready: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(indexing: &IndexingConfig, backend: &BackendConfig) -> String {
        format!("{}::{}", indexing.id, backend.id)
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns the shared adapter for the pair, constructing it on first
    /// use. Concurrent callers of the same key all receive the one instance
    /// built by whichever caller won the per-key lock.
    pub async fn get_or_create(
        &self,
        indexing: &IndexingConfig,
        backend: &BackendConfig,
    ) -> Result<Arc<dyn VectorStoreAdapter>> {
        let key = Self::cache_key(indexing, backend);
        if let Some(adapter) = self.ready.read().await.get(&key) {
            return Ok(adapter.clone());
        }

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        // Another caller may have finished constructing while this one
        // waited on the lock.
        if let Some(adapter) = self.ready.read().await.get(&key) {
            return Ok(adapter.clone());
        }

        debug!(key = %key, "constructing adapter");
        match self.factory.build(indexing, backend).await {
            Ok(adapter) => {
                self.ready.write().await.insert(key.clone(), adapter.clone());
                info!(key = %key, backend_id = %adapter.backend_id(), "adapter ready");
                Ok(adapter)
            }
            Err(e) => Err(Error::ConstructionFailure {
                key,
                message: e.to_string(),
            }),
        }
    }

    /// The adapter for the pair if one is already constructed. Never
    /// triggers construction.
    pub async fn get(
        &self,
        indexing: &IndexingConfig,
        backend: &BackendConfig,
    ) -> Option<Arc<dyn VectorStoreAdapter>> {
        let key = Self::cache_key(indexing, backend);
        self.ready.read().await.get(&key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.ready.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ready.read().await.is_empty()
    }

    /// Drains the registry and closes every adapter. Close failures are
    /// logged rather than aborting the drain, so one bad backend cannot
    /// keep the rest open.
    pub async fn close_all(&self) -> Result<()> {
        let drained: Vec<(String, Arc<dyn VectorStoreAdapter>)> = {
            let mut ready = self.ready.write().await;
            ready.drain().collect()
        };
        for (key, adapter) in drained {
            if let Err(e) = adapter.close().await {
                warn!(key = %key, error = %e, "adapter close failed");
            }
        }
        Ok(())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new(Arc::new(BackendAdapterFactory))
    }
}
