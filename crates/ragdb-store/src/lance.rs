//! LanceDB adapter: the reference backend, serving vector, full-text and
//! hybrid search from one table.
//!
//! Rows are merged on the derived `id` column, so replaying an upsert
//! converges instead of duplicating. The full-text index does not follow
//! writes on its own; the adapter tracks staleness and rebuilds the index
//! before the next full-text or hybrid query, or eagerly on `optimize`.

use std::sync::atomic::{AtomicBool, Ordering};

use arrow_array::{Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::index::scalar::{FtsIndexBuilder, FullTextSearchQuery};
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase, QueryExecutionOptions};
use lancedb::{connect, Connection, DistanceType, Table};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::VectorStoreAdapter;
use ragdb_core::types::{
    BackendConfig, ChunkRecord, SearchHit, SearchMode, SearchRequest, SimilarityMetric, SourceKind,
};

use crate::schema::{chunks_schema, records_to_batch};

pub struct LanceAdapter {
    config: BackendConfig,
    connection: RwLock<Option<Connection>>,
    // Set by writes, cleared by the rebuild before the next FTS query.
    fts_stale: AtomicBool,
}

impl LanceAdapter {
    pub async fn open(config: BackendConfig) -> Result<Self> {
        let conn = connect(&config.uri)
            .execute()
            .await
            .map_err(|e| Error::backend(&config.id, "connect", e))?;
        Ok(Self {
            config,
            connection: RwLock::new(Some(conn)),
            fts_stale: AtomicBool::new(false),
        })
    }

    async fn conn(&self, op: &'static str) -> Result<Connection> {
        let guard = self.connection.read().await;
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| Error::backend(&self.config.id, op, "adapter is closed"))
    }

    async fn table(&self, op: &'static str) -> Result<Table> {
        let conn = self.conn(op).await?;
        conn.open_table(&self.config.table)
            .execute()
            .await
            .map_err(|e| Error::backend(&self.config.id, op, e))
    }

    /// Rebuilds the full-text index if writes have landed since the last
    /// rebuild. Cheap no-op otherwise.
    async fn refresh_fts(&self, table: &Table) -> Result<()> {
        if !self.fts_stale.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(backend_id = %self.config.id, "rebuilding full-text index after writes");
        if let Err(e) = table
            .create_index(&["content"], Index::FTS(FtsIndexBuilder::default()))
            .execute()
            .await
        {
            self.fts_stale.store(true, Ordering::SeqCst);
            return Err(Error::backend(&self.config.id, "fts rebuild", e));
        }
        Ok(())
    }

    fn query_vector<'a>(&self, request: &'a SearchRequest) -> Result<&'a Vec<f32>> {
        let vector = request
            .vector
            .as_ref()
            .ok_or_else(|| Error::InvalidQuery("vector search requires a query embedding".into()))?;
        if vector.len() != self.config.dim {
            return Err(Error::InvalidQuery(format!(
                "query embedding has {} dimensions, backend expects {}",
                vector.len(),
                self.config.dim
            )));
        }
        Ok(vector)
    }

    fn distance_type(&self) -> DistanceType {
        match self.config.metric {
            SimilarityMetric::Cosine => DistanceType::Cosine,
            SimilarityMetric::L2 => DistanceType::L2,
            SimilarityMetric::Dot => DistanceType::Dot,
        }
    }

    /// Higher-is-better score from a raw `_distance` value.
    fn distance_to_score(&self, distance: f32) -> f32 {
        match self.config.metric {
            SimilarityMetric::Cosine => 1.0 - distance,
            SimilarityMetric::L2 | SimilarityMetric::Dot => -distance,
        }
    }

    fn score_at(&self, batch: &RecordBatch, i: usize) -> f32 {
        if let Some(col) = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        {
            return self.distance_to_score(col.value(i));
        }
        for name in ["_relevance_score", "_score"] {
            if let Some(col) = batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            {
                return col.value(i);
            }
        }
        0.0
    }

    fn hits_from_batch(&self, batch: &RecordBatch, source: SourceKind) -> Result<Vec<SearchHit>> {
        let missing = |col: &'static str| Error::backend(&self.config.id, "search", format!("column '{col}' missing from result batch"));
        let ids = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| missing("id"))?;
        let doc_ids = batch
            .column_by_name("doc_id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| missing("doc_id"))?;
        let chunk_indices = batch
            .column_by_name("chunk_index")
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .ok_or_else(|| missing("chunk_index"))?;

        let mut hits = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            hits.push(SearchHit {
                id: ids.value(i).to_string(),
                doc_id: doc_ids.value(i).to_string(),
                chunk_index: chunk_indices.value(i).max(0) as usize,
                score: self.score_at(batch, i),
                source,
            });
        }
        Ok(hits)
    }

    async fn collect_hits<S, E>(&self, mut stream: S, source: SourceKind) -> Result<Vec<SearchHit>>
    where
        S: futures::Stream<Item = std::result::Result<RecordBatch, E>> + Unpin,
        E: std::fmt::Display,
    {
        let mut hits = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| Error::backend(&self.config.id, "search", e))?
        {
            hits.extend(self.hits_from_batch(&batch, source)?);
        }
        Ok(hits)
    }

    async fn vector_search(&self, table: &Table, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let vector = self.query_vector(request)?.clone();
        let stream = table
            .vector_search(vector)
            .map_err(|e| Error::backend(&self.config.id, "search", e))?
            .distance_type(self.distance_type())
            .limit(request.k)
            .execute()
            .await
            .map_err(|e| Error::backend(&self.config.id, "search", e))?;
        self.collect_hits(stream, SourceKind::Vector).await
    }

    async fn text_search(&self, table: &Table, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.refresh_fts(table).await?;
        let stream = table
            .query()
            .full_text_search(FullTextSearchQuery::new(request.text.clone()))
            .limit(request.k)
            .execute()
            .await
            .map_err(|e| Error::backend(&self.config.id, "search", e))?;
        self.collect_hits(stream, SourceKind::Text).await
    }

    async fn hybrid_search(&self, table: &Table, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.refresh_fts(table).await?;
        let vector = self.query_vector(request)?.clone();
        let stream = table
            .query()
            .full_text_search(FullTextSearchQuery::new(request.text.clone()))
            .nearest_to(vector)
            .map_err(|e| Error::backend(&self.config.id, "search", e))?
            .distance_type(self.distance_type())
            .limit(request.k)
            .execute_hybrid(QueryExecutionOptions::default())
            .await
            .map_err(|e| Error::backend(&self.config.id, "search", e))?;
        self.collect_hits(stream, SourceKind::Vector).await
    }
}

#[async_trait]
impl VectorStoreAdapter for LanceAdapter {
    fn backend_id(&self) -> &str {
        &self.config.id
    }

    fn metric(&self) -> SimilarityMetric {
        self.config.metric
    }

    async fn create_index(&self) -> Result<()> {
        let conn = self.conn("create_index").await?;
        let tables = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| Error::backend(&self.config.id, "create_index", e))?;
        if tables.contains(&self.config.table) {
            return Ok(());
        }

        info!(backend_id = %self.config.id, table = %self.config.table, "creating chunks table");
        conn.create_empty_table(&self.config.table, chunks_schema(self.config.dim))
            .execute()
            .await
            .map_err(|e| Error::backend(&self.config.id, "create_index", e))?;

        let table = self.table("create_index").await?;
        if let Err(e) = table
            .create_index(&["content"], Index::FTS(FtsIndexBuilder::default()))
            .execute()
            .await
        {
            warn!(backend_id = %self.config.id, error = %e, "fts index creation failed, will retry before first full-text query");
            self.fts_stale.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn upsert_chunks(&self, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for record in records {
            if record.vector.len() != self.config.dim {
                return Err(Error::EmbeddingMismatch {
                    requested: self.config.dim,
                    returned: record.vector.len(),
                });
            }
        }

        debug!(backend_id = %self.config.id, records = records.len(), "upserting chunks");
        let table = self.table("upsert").await?;
        let batch = records_to_batch(records, self.config.dim)
            .map_err(|e| Error::backend(&self.config.id, "upsert", e))?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema));

        let mut merge = table.merge_insert(&["id"]);
        merge.when_matched_update_all(None).when_not_matched_insert_all();
        merge
            .execute(reader)
            .await
            .map_err(|e| Error::backend(&self.config.id, "upsert", e))?;

        self.fts_stale.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let table = self.table("search").await?;
        match request.mode {
            SearchMode::Vector => self.vector_search(&table, request).await,
            SearchMode::FullText => self.text_search(&table, request).await,
            SearchMode::Hybrid => self.hybrid_search(&table, request).await,
        }
    }

    async fn count_records(&self) -> Result<usize> {
        let table = self.table("count").await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| Error::backend(&self.config.id, "count", e))
    }

    async fn optimize(&self) -> Result<()> {
        let table = self.table("optimize").await?;
        self.fts_stale.store(true, Ordering::SeqCst);
        self.refresh_fts(&table).await
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.connection.write().await;
        if guard.take().is_some() {
            debug!(backend_id = %self.config.id, "closed lance connection");
        }
        Ok(())
    }
}
