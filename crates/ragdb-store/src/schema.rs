//! Arrow schema for the chunks table and record-to-batch conversion.

use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, StringArray};
use arrow_schema::{ArrowError, DataType, Field, Schema};

use ragdb_core::types::ChunkRecord;

/// The chunks table: one row per `(doc_id, chunk_index)` pair, keyed by the
/// derived `id` column so upserts converge instead of duplicating rows.
pub fn chunks_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("doc_id", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("content", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32),
            false,
        ),
    ]))
}

/// Converts chunk records to one Arrow batch. Vector lengths must already
/// have been validated against `dim`.
pub fn records_to_batch(records: &[ChunkRecord], dim: usize) -> Result<RecordBatch, ArrowError> {
    let ids: Vec<String> = records.iter().map(ChunkRecord::chunk_id).collect();
    let doc_ids: Vec<String> = records.iter().map(|r| r.doc_id.clone()).collect();
    let chunk_indices: Vec<i32> = records.iter().map(|r| r.chunk_index as i32).collect();
    let contents: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let vectors: Vec<Option<Vec<Option<f32>>>> = records
        .iter()
        .map(|r| Some(r.vector.iter().map(|&x| Some(x)).collect()))
        .collect();

    RecordBatch::try_new(
        chunks_schema(dim),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(doc_ids)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(StringArray::from(contents)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
                vectors.into_iter(),
                dim as i32,
            )),
        ],
    )
}
