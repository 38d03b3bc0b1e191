//! Walks a project's documents and assembles (document, chunks, embeddings)
//! triples for one indexing configuration.
//!
//! The loader is a lazy, single-pass iterator: consuming it reads each
//! document once, and re-iterating means constructing a new loader over the
//! project. Documents missing a matching artifact for any stage are skipped;
//! a chunk/embedding count mismatch aborts the whole run instead, because a
//! silent skip would leave the index incomplete without signaling it.

use tracing::debug;

use ragdb_core::dedupe::canonical_for;
use ragdb_core::error::{Error, Result};
use ragdb_core::types::{ChunkRecord, Document, IndexingConfig, Project};

/// One matched triple, ready to be turned into indexable records.
#[derive(Debug, Clone)]
pub struct IngestionItem {
    pub doc_id: String,
    pub chunks: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

impl IngestionItem {
    /// Pairs chunks with vectors in chunk-index order. The counts were
    /// validated when the item was produced, so this cannot misalign.
    pub fn into_records(self) -> Vec<ChunkRecord> {
        let doc_id = self.doc_id;
        self.chunks
            .into_iter()
            .zip(self.vectors)
            .enumerate()
            .map(|(chunk_index, (text, vector))| ChunkRecord {
                doc_id: doc_id.clone(),
                chunk_index,
                text,
                vector,
            })
            .collect()
    }
}

/// Lazy iterator over a project's documents for one indexing config.
pub struct IngestionLoader<'a> {
    config: &'a IndexingConfig,
    documents: std::slice::Iter<'a, Document>,
    // Set after yielding an error; the iterator then stays exhausted.
    failed: bool,
}

impl<'a> IngestionLoader<'a> {
    pub fn new(project: &'a Project, config: &'a IndexingConfig) -> Self {
        Self {
            config,
            documents: project.documents().iter(),
            failed: false,
        }
    }

    /// Resolves the canonical triple for one document, or `Ok(None)` when a
    /// stage has no artifact for the configured ids.
    fn resolve(&self, doc: &Document) -> Result<Option<IngestionItem>> {
        if let Some(tag) = &self.config.tag_filter {
            if !doc.has_tag(tag) {
                debug!(doc_id = %doc.id, tag = %tag, "document skipped by tag filter");
                return Ok(None);
            }
        }

        let Some(extraction) = canonical_for(doc.extractions(), &self.config.extractor_config_id)
        else {
            debug!(doc_id = %doc.id, "no extraction for configured extractor, skipping");
            return Ok(None);
        };
        let Some(chunked) = canonical_for(
            &extraction.chunked_documents,
            &self.config.chunker_config_id,
        ) else {
            debug!(doc_id = %doc.id, "no chunked document for configured chunker, skipping");
            return Ok(None);
        };
        let Some(embeddings) = canonical_for(
            &chunked.chunk_embeddings,
            &self.config.embedding_config_id,
        ) else {
            debug!(doc_id = %doc.id, "no embeddings for configured embedder, skipping");
            return Ok(None);
        };

        if chunked.chunks.len() != embeddings.vectors.len() {
            return Err(Error::ArtifactMismatch {
                doc_id: doc.id.clone(),
                chunks: chunked.chunks.len(),
                embeddings: embeddings.vectors.len(),
            });
        }

        Ok(Some(IngestionItem {
            doc_id: doc.id.clone(),
            chunks: chunked.chunks.clone(),
            vectors: embeddings.vectors.clone(),
        }))
    }
}

impl Iterator for IngestionLoader<'_> {
    type Item = Result<IngestionItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let doc = self.documents.next()?;
            match self.resolve(doc) {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
