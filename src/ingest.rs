//! Indexer write path.
//!
//! Computes embeddings for ingested text chunks, filters degenerate
//! vectors, assigns incrementing identifiers, and writes to the
//! document store. Identifiers start at the store's document count at
//! write time — an advisory offset, not a reservation. Two concurrent
//! ingest calls can compute the same starting id and silently
//! overwrite each other; the write path is single-writer by contract.
//!
//! The batch is best-effort, not transactional: a failure partway
//! through leaves earlier writes in place.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::embedding::{SpaceEmbedder, VectorSpace};
use crate::error::PipelineError;
use crate::store::{DocumentStore, StoreDocument};

/// One text chunk queued for indexing.
#[derive(Debug, Clone)]
pub struct ChunkInput {
    /// Logical source (group key) the chunk belongs to.
    pub group_key: String,
    pub text: String,
    /// Publication date for dated collections.
    pub date: Option<NaiveDate>,
}

/// Collapse newlines and commas and trim, matching how content is
/// normalized before embedding.
pub fn normalize_chunk(text: &str) -> String {
    text.replace('\n', " ")
        .replace(',', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Embed and write `chunks` to `index`, returning the number of
/// documents written.
///
/// Per chunk: normalize, embed, skip (and log) if the embedding is
/// degenerate, else write at `count-at-start + offset`. A skipped
/// chunk still consumes its id offset. Embedding failures and write
/// failures abort the batch; documents already written stand.
pub async fn ingest<S: VectorSpace>(
    store: &dyn DocumentStore,
    index: &str,
    embedder: &SpaceEmbedder<S>,
    chunks: &[ChunkInput],
) -> Result<u64, PipelineError> {
    let next_id = store.count(index).await?;
    let mut written = 0u64;

    for (offset, chunk) in chunks.iter().enumerate() {
        let id = next_id + offset as u64;
        let content = normalize_chunk(&chunk.text);
        let embedding = embedder.embed(&content).await?;

        if embedding.is_degenerate() {
            warn!(index, id, content = %content, "skipping chunk: zero vector");
            continue;
        }

        let document = StoreDocument {
            source: chunk.group_key.clone(),
            content,
            vector: embedding.into_raw(),
            date_field: chunk.date,
        };
        store.index_document(index, id, &document).await?;
        written += 1;
    }

    info!(index, written, total = chunks.len(), "ingest complete");
    Ok(written)
}
