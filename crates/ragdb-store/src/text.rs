//! Tantivy adapter: full-text only.
//!
//! Idempotent upsert is a delete-by-id followed by a fresh add under one
//! commit, so replaying a batch never duplicates chunks. Vector and hybrid
//! requests are refused up front instead of being faked with a text query.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument, Term};
use tracing::debug;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::VectorStoreAdapter;
use ragdb_core::types::{
    BackendConfig, ChunkRecord, SearchHit, SearchMode, SearchRequest, SimilarityMetric, SourceKind,
};

const TOKENIZER_NAME: &str = "text_with_stopwords";
const WRITER_HEAP_BYTES: usize = 50_000_000;

fn build_schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_text_field("id", STRING | STORED);
    builder.add_text_field("doc_id", STRING | STORED);
    builder.add_u64_field("chunk_index", STORED);
    let content_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    builder.add_text_field(
        "content",
        TextOptions::default().set_indexing_options(content_indexing).set_stored(),
    );
    builder.build()
}

fn register_tokenizer(index: &Index) {
    let stop_words = vec![
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "or", "but", "not",
        "this", "these", "they", "them", "their", "there", "then", "than", "so", "if", "when",
        "where", "why", "how", "what", "which", "who", "whom", "whose", "can", "could", "should",
        "would", "may", "might", "must", "shall", "do", "does", "did", "have", "had", "having",
    ];
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(stop_words.into_iter().map(str::to_string)))
        .build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}

pub struct TantivyAdapter {
    config: BackendConfig,
    index: Index,
    id_field: Field,
    doc_id_field: Field,
    chunk_index_field: Field,
    content_field: Field,
    // None after close.
    writer: Mutex<Option<IndexWriter>>,
    reader: IndexReader,
}

impl TantivyAdapter {
    pub fn open(config: BackendConfig) -> Result<Self> {
        let index_dir = PathBuf::from(&config.uri);
        std::fs::create_dir_all(&index_dir)?;
        let schema = build_schema();
        let dir = MmapDirectory::open(&index_dir)
            .map_err(|e| Error::backend(&config.id, "open", e))?;
        let index = Index::open_or_create(dir, schema.clone())
            .map_err(|e| Error::backend(&config.id, "open", e))?;
        register_tokenizer(&index);

        let id_field = schema
            .get_field("id")
            .map_err(|e| Error::backend(&config.id, "open", e))?;
        let doc_id_field = schema
            .get_field("doc_id")
            .map_err(|e| Error::backend(&config.id, "open", e))?;
        let chunk_index_field = schema
            .get_field("chunk_index")
            .map_err(|e| Error::backend(&config.id, "open", e))?;
        let content_field = schema
            .get_field("content")
            .map_err(|e| Error::backend(&config.id, "open", e))?;

        let writer = index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|e| Error::backend(&config.id, "open", e))?;
        let reader = index
            .reader()
            .map_err(|e| Error::backend(&config.id, "open", e))?;

        Ok(Self {
            config,
            index,
            id_field,
            doc_id_field,
            chunk_index_field,
            content_field,
            writer: Mutex::new(Some(writer)),
            reader,
        })
    }

    fn writer_guard(
        &self,
        op: &'static str,
    ) -> Result<std::sync::MutexGuard<'_, Option<IndexWriter>>> {
        self.writer
            .lock()
            .map_err(|e| Error::backend(&self.config.id, op, e))
    }

    fn ensure_open(&self, op: &'static str) -> Result<()> {
        if self.writer_guard(op)?.is_none() {
            return Err(Error::backend(&self.config.id, op, "adapter is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStoreAdapter for TantivyAdapter {
    fn backend_id(&self) -> &str {
        &self.config.id
    }

    fn metric(&self) -> SimilarityMetric {
        self.config.metric
    }

    async fn create_index(&self) -> Result<()> {
        // The index directory and schema were set up in `open`; repeat calls
        // have nothing left to do.
        self.ensure_open("create_index")
    }

    async fn upsert_chunks(&self, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        debug!(backend_id = %self.config.id, records = records.len(), "upserting chunks");

        let mut guard = self.writer_guard("upsert")?;
        let writer = guard
            .as_mut()
            .ok_or_else(|| Error::backend(&self.config.id, "upsert", "adapter is closed"))?;
        for record in records {
            let id = record.chunk_id();
            writer.delete_term(Term::from_field_text(self.id_field, &id));
            writer
                .add_document(doc!(
                    self.id_field => id,
                    self.doc_id_field => record.doc_id.clone(),
                    self.chunk_index_field => record.chunk_index as u64,
                    self.content_field => record.text.clone(),
                ))
                .map_err(|e| Error::backend(&self.config.id, "upsert", e))?;
        }
        writer
            .commit()
            .map_err(|e| Error::backend(&self.config.id, "upsert", e))?;
        drop(guard);

        self.reader
            .reload()
            .map_err(|e| Error::backend(&self.config.id, "upsert", e))
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.ensure_open("search")?;
        if request.mode != SearchMode::FullText {
            return Err(Error::UnsupportedSearchMode {
                backend_id: self.config.id.clone(),
                mode: request.mode,
            });
        }
        if request.k == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        let query = parser
            .parse_query(&request.text)
            .map_err(|e| Error::InvalidQuery(e.to_string()))?;
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(request.k))
            .map_err(|e| Error::backend(&self.config.id, "search", e))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let stored: TantivyDocument = searcher
                .doc(addr)
                .map_err(|e| Error::backend(&self.config.id, "search", e))?;
            let id = stored
                .get_first(self.id_field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let doc_id = stored
                .get_first(self.doc_id_field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let chunk_index = stored
                .get_first(self.chunk_index_field)
                .and_then(|v| v.as_u64())
                .unwrap_or_default() as usize;
            hits.push(SearchHit {
                id,
                doc_id,
                chunk_index,
                score,
                source: SourceKind::Text,
            });
        }
        Ok(hits)
    }

    async fn count_records(&self) -> Result<usize> {
        self.ensure_open("count")?;
        Ok(self.reader.searcher().num_docs() as usize)
    }

    async fn optimize(&self) -> Result<()> {
        self.ensure_open("optimize")?;
        self.reader
            .reload()
            .map_err(|e| Error::backend(&self.config.id, "optimize", e))
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.writer_guard("close")?;
        if guard.take().is_some() {
            debug!(backend_id = %self.config.id, "closed tantivy writer");
        }
        Ok(())
    }
}
