//! Vector-store abstraction.
//!
//! The [`VectorStore`] trait defines the four index operations the search
//! service needs, enabling pluggable backends (SQLite, in-memory, future
//! ANN indexes) with no inheritance hierarchy — capability-set
//! polymorphism only. The companion [`ChunkLookup`] trait resolves a
//! chunk id back to display metadata so results can be built without a
//! second round-trip per hit.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Contract
//!
//! - After `add_embeddings` returns success, a subsequent
//!   `search_similar` must be able to surface every added id.
//! - After `delete_embeddings` returns success, deleted ids never appear
//!   in any later search result.
//! - Empty batches are no-ops that succeed trivially.
//! - Scores handed to callers are normalized into `[0.0, 1.0]` and
//!   results are ordered by descending similarity.

pub mod memory;

use async_trait::async_trait;

use crate::error::CoreError;

/// The persisted form of a chunk's vector, keyed by chunk id and
/// namespaced by document. Never mutated in place: re-embedding
/// replaces the full record.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    /// Chunk UUID.
    pub id: String,
    /// Owning document id (cascade-deleted with the document).
    pub document_id: String,
    pub vector: Vec<f32>,
    /// Queryable schema-element tags (e.g. `"E1-1"`).
    pub schema_elements: Vec<String>,
}

/// A raw search hit: chunk id plus normalized similarity.
#[derive(Debug, Clone)]
pub struct ScoredId {
    pub id: String,
    /// Normalized similarity in `[0.0, 1.0]`.
    pub score: f64,
}

/// Metadata predicate applied inside `search_similar`.
///
/// A record passes when every populated field matches: the document id
/// equals `document_id`, and the record carries at least one of the
/// requested `schema_elements`.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub document_id: Option<String>,
    pub schema_elements: Option<Vec<String>>,
}

impl SearchFilter {
    /// Evaluate the predicate against one record's metadata.
    pub fn matches(&self, document_id: &str, elements: &[String]) -> bool {
        if let Some(ref want_doc) = self.document_id {
            if want_doc != document_id {
                return false;
            }
        }
        if let Some(ref want_elements) = self.schema_elements {
            if !want_elements.iter().any(|w| elements.contains(w)) {
                return false;
            }
        }
        true
    }
}

/// Display metadata for a chunk, used to enrich search results.
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub document_filename: String,
}

/// Abstract vector index.
///
/// All operations take batches to amortize backend round-trips.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist a batch of embedding records, replacing any existing
    /// record with the same id. An empty batch is a trivial success.
    async fn add_embeddings(&self, records: &[EmbeddingRecord]) -> Result<(), CoreError>;

    /// Nearest-neighbor search: the `top_k` most similar records,
    /// restricted to `filter` when given, ordered by descending
    /// normalized similarity.
    async fn search_similar(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredId>, CoreError>;

    /// Remove records by id. Unknown ids are not an error (idempotent).
    async fn delete_embeddings(&self, ids: &[String]) -> Result<(), CoreError>;

    /// Fetch the stored vector for one chunk id.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when no record exists for `id`.
    async fn get_embedding(&self, id: &str) -> Result<Vec<f32>, CoreError>;
}

/// Resolve a chunk id to display metadata. `None` when the chunk no
/// longer exists (e.g. its document was deleted between index read and
/// enrichment) — the search service drops such hits silently.
#[async_trait]
pub trait ChunkLookup: Send + Sync {
    async fn get_chunk_meta(&self, id: &str) -> Result<Option<ChunkMeta>, CoreError>;
}

/// The full capability set the search service requires from a backend.
pub trait SearchBackend: VectorStore + ChunkLookup {}

impl<T: VectorStore + ChunkLookup> SearchBackend for T {}
