//! Document ingestion pipeline.
//!
//! Extract → chunk → persist → embed, with a per-document async mutex so
//! re-ingesting the same document id never interleaves. Re-ingestion is
//! replace-not-append: old chunks and vectors for the id are removed
//! before the new rows land.
//!
//! Embedding failures do not fail ingestion — the document stays
//! searchable-by-metadata with status `partial`, and a later re-ingest
//! (or a provider coming back) completes it. Extraction failures fail
//! the whole operation before any rows change.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use disclose_core::chunk::chunk_text;
use disclose_core::embedding::EmbeddingProvider;
use disclose_core::store::{EmbeddingRecord, VectorStore};

use crate::config::Config;
use crate::extract::extract_text;
use crate::sqlite_store::SqliteVectorStore;

/// Per-document mutex registry. One lock per document id, created on
/// first use and kept for the life of the process.
#[derive(Default)]
pub struct IngestLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IngestLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self, document_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().await;
            map.entry(document_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// What an ingest run produced.
#[derive(Debug)]
pub struct IngestOutcome {
    pub document_id: String,
    pub chunk_count: usize,
    pub embedded_count: usize,
    /// `ready` when every chunk has a vector, `partial` otherwise.
    pub status: String,
}

/// Ingest one document: extract text, chunk it, replace any previous
/// rows for the id, then embed chunk-by-batch.
///
/// A caller-supplied `document_id` makes the operation an update;
/// otherwise a fresh UUID is minted.
#[allow(clippy::too_many_arguments)]
pub async fn ingest_document(
    config: &Config,
    pool: &SqlitePool,
    store: &SqliteVectorStore,
    provider: &Arc<dyn EmbeddingProvider>,
    locks: &IngestLocks,
    bytes: &[u8],
    content_type: &str,
    filename: &str,
    document_id: Option<String>,
    schema_elements: &[String],
) -> Result<IngestOutcome> {
    let document_id = document_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let _guard = locks.acquire(&document_id).await;

    let text = extract_text(bytes, content_type)
        .with_context(|| format!("Failed to extract text from {}", filename))?;

    let mut chunks = chunk_text(
        &document_id,
        &text,
        config.chunking.chunk_size,
        config.chunking.overlap,
    )?;
    for chunk in &mut chunks {
        chunk.schema_elements = schema_elements.to_vec();
    }

    tracing::info!(
        document_id = %document_id,
        filename = %filename,
        chunks = chunks.len(),
        "ingesting document"
    );

    // Replace previous rows for this id in one transaction.
    let elements_json = serde_json::to_string(schema_elements)?;
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
        .bind(&document_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(&document_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(&document_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO documents (id, filename, content_type, status, schema_elements_json, created_at)
        VALUES (?, ?, ?, 'partial', ?, ?)
        "#,
    )
    .bind(&document_id)
    .bind(filename)
    .bind(content_type)
    .bind(&elements_json)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for chunk in &chunks {
        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_index, content, start_offset, end_offset, schema_elements_json, hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(chunk.start_offset as i64)
        .bind(chunk.end_offset as i64)
        .bind(&elements_json)
        .bind(&chunk.hash)
        .bind(chunk.created_at.timestamp())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    // Embed in batches. A failed batch is logged and skipped; the
    // document ends up `partial` instead of failing the ingest.
    let mut embedded_count = 0usize;
    for batch in chunks.chunks(config.embedding.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        match provider.embed_batch(&texts).await {
            Ok(vectors) => {
                let records: Vec<EmbeddingRecord> = batch
                    .iter()
                    .zip(vectors)
                    .map(|(chunk, vector)| EmbeddingRecord {
                        id: chunk.id.clone(),
                        document_id: chunk.document_id.clone(),
                        vector,
                        schema_elements: chunk.schema_elements.clone(),
                    })
                    .collect();
                store.add_embeddings(&records).await?;
                embedded_count += records.len();
            }
            Err(e) => {
                tracing::warn!(
                    document_id = %document_id,
                    batch_size = batch.len(),
                    error = %e,
                    "embedding batch failed; continuing without vectors"
                );
            }
        }
    }

    let status = if embedded_count == chunks.len() {
        "ready"
    } else {
        "partial"
    };
    sqlx::query("UPDATE documents SET status = ? WHERE id = ?")
        .bind(status)
        .bind(&document_id)
        .execute(pool)
        .await?;

    Ok(IngestOutcome {
        document_id,
        chunk_count: chunks.len(),
        embedded_count,
        status: status.to_string(),
    })
}

/// Remove a document and everything derived from it. Idempotent: a
/// missing id is a no-op, not an error.
pub async fn delete_document(
    pool: &SqlitePool,
    locks: &IngestLocks,
    document_id: &str,
) -> Result<()> {
    let _guard = locks.acquire(document_id).await;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    let res = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    if res.rows_affected() == 0 {
        tracing::debug!(document_id = %document_id, "delete of unknown document id");
    } else {
        tracing::info!(document_id = %document_id, "deleted document");
    }
    Ok(())
}
