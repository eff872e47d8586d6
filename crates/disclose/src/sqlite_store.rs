//! SQLite-backed [`VectorStore`] implementation.
//!
//! Vectors are stored as little-endian f32 BLOBs in `chunk_vectors`;
//! similarity search is brute-force cosine over the (filtered) rows,
//! normalized into `[0, 1]` before leaving the store. Chunk display
//! metadata comes from the `chunks`/`documents` tables through the
//! [`ChunkLookup`] trait.
//!
//! Every sqlx failure is surfaced as
//! [`CoreError::VectorStoreUnavailable`]; the pool's bounded acquire
//! timeout guarantees calls fail rather than hang when the database is
//! wedged.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use disclose_core::embedding::{blob_to_vec, cosine_similarity, normalize_similarity, vec_to_blob};
use disclose_core::error::CoreError;
use disclose_core::store::{
    ChunkLookup, ChunkMeta, EmbeddingRecord, ScoredId, SearchFilter, VectorStore,
};

/// SQLite implementation of the [`VectorStore`] + [`ChunkLookup`] pair.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    model: String,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool, model: impl Into<String>) -> Self {
        Self {
            pool,
            model: model.into(),
        }
    }
}

fn store_err(e: sqlx::Error) -> CoreError {
    CoreError::VectorStoreUnavailable(e.to_string())
}

fn parse_elements(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add_embeddings(&self, records: &[EmbeddingRecord]) -> Result<(), CoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        for record in records {
            let blob = vec_to_blob(&record.vector);
            let elements_json =
                serde_json::to_string(&record.schema_elements).unwrap_or_else(|_| "[]".to_string());
            sqlx::query(
                r#"
                INSERT INTO chunk_vectors (chunk_id, document_id, embedding, model, dims, schema_elements_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(chunk_id) DO UPDATE SET
                    document_id = excluded.document_id,
                    embedding = excluded.embedding,
                    model = excluded.model,
                    dims = excluded.dims,
                    schema_elements_json = excluded.schema_elements_json,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&record.id)
            .bind(&record.document_id)
            .bind(&blob)
            .bind(&self.model)
            .bind(record.vector.len() as i64)
            .bind(&elements_json)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn search_similar(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredId>, CoreError> {
        // Document-id restriction is pushed into SQL; the schema-element
        // predicate is evaluated in Rust against the tag JSON.
        let rows = match filter.and_then(|f| f.document_id.as_deref()) {
            Some(doc_id) => sqlx::query(
                "SELECT chunk_id, document_id, embedding, schema_elements_json FROM chunk_vectors WHERE document_id = ?",
            )
            .bind(doc_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?,
            None => sqlx::query(
                "SELECT chunk_id, document_id, embedding, schema_elements_json FROM chunk_vectors",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?,
        };

        let mut hits: Vec<ScoredId> = rows
            .iter()
            .filter_map(|row| {
                let document_id: String = row.get("document_id");
                let elements = parse_elements(&row.get::<String, _>("schema_elements_json"));
                if let Some(f) = filter {
                    if !f.matches(&document_id, &elements) {
                        return None;
                    }
                }
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                Some(ScoredId {
                    id: row.get("chunk_id"),
                    score: normalize_similarity(cosine_similarity(query_vector, &vector)),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete_embeddings(&self, ids: &[String]) -> Result<(), CoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        for id in ids {
            sqlx::query("DELETE FROM chunk_vectors WHERE chunk_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn get_embedding(&self, id: &str) -> Result<Vec<f32>, CoreError> {
        let row = sqlx::query("SELECT embedding FROM chunk_vectors WHERE chunk_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        match row {
            Some(row) => {
                let blob: Vec<u8> = row.get("embedding");
                Ok(blob_to_vec(&blob))
            }
            None => Err(CoreError::NotFound(format!(
                "no embedding for chunk {}",
                id
            ))),
        }
    }
}

#[async_trait]
impl ChunkLookup for SqliteVectorStore {
    async fn get_chunk_meta(&self, id: &str) -> Result<Option<ChunkMeta>, CoreError> {
        let row = sqlx::query(
            r#"
            SELECT c.id, c.document_id, c.chunk_index, c.content, d.filename
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE c.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|r| ChunkMeta {
            chunk_id: r.get("id"),
            document_id: r.get("document_id"),
            chunk_index: r.get("chunk_index"),
            content: r.get("content"),
            document_filename: r.get("filename"),
        }))
    }
}
