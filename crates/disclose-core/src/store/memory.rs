//! In-memory [`VectorStore`] implementation for tests and embedded use.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock` for thread
//! safety. Search is brute-force cosine similarity over all stored
//! vectors, normalized into `[0, 1]`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::{cosine_similarity, normalize_similarity};
use crate::error::CoreError;
use crate::models::Chunk;

use super::{ChunkLookup, ChunkMeta, EmbeddingRecord, ScoredId, SearchFilter, VectorStore};

/// Brute-force in-memory vector index.
#[derive(Default)]
pub struct MemoryVectorStore {
    records: RwLock<Vec<EmbeddingRecord>>,
    chunks: RwLock<HashMap<String, ChunkMeta>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register chunk display metadata so search results can be
    /// enriched. The SQLite backend gets this from its `chunks` table;
    /// here the caller supplies it alongside the vectors.
    pub fn register_chunks(&self, chunks: &[Chunk], document_filename: &str) {
        let mut map = self.chunks.write().unwrap();
        for c in chunks {
            map.insert(
                c.id.clone(),
                ChunkMeta {
                    chunk_id: c.id.clone(),
                    document_id: c.document_id.clone(),
                    chunk_index: c.chunk_index,
                    content: c.content.clone(),
                    document_filename: document_filename.to_string(),
                },
            );
        }
    }

    /// Drop all vectors and chunk metadata belonging to one document.
    pub fn remove_document(&self, document_id: &str) {
        self.records
            .write()
            .unwrap()
            .retain(|r| r.document_id != document_id);
        self.chunks
            .write()
            .unwrap()
            .retain(|_, m| m.document_id != document_id);
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_embeddings(&self, records: &[EmbeddingRecord]) -> Result<(), CoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut stored = self.records.write().unwrap();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record.clone());
        }
        Ok(())
    }

    async fn search_similar(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredId>, CoreError> {
        let stored = self.records.read().unwrap();
        let mut hits: Vec<ScoredId> = stored
            .iter()
            .filter(|r| {
                filter
                    .map(|f| f.matches(&r.document_id, &r.schema_elements))
                    .unwrap_or(true)
            })
            .map(|r| ScoredId {
                id: r.id.clone(),
                score: normalize_similarity(cosine_similarity(query_vector, &r.vector)),
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
        self.records
            .write()
            .unwrap()
            .retain(|r| !ids.contains(&r.id));
        self.chunks
            .write()
            .unwrap()
            .retain(|id, _| !ids.contains(id));
        Ok(())
    }

    async fn get_embedding(&self, id: &str) -> Result<Vec<f32>, CoreError> {
        let stored = self.records.read().unwrap();
        stored
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.vector.clone())
            .ok_or_else(|| CoreError::NotFound(format!("no embedding for chunk {}", id)))
    }
}

#[async_trait]
impl ChunkLookup for MemoryVectorStore {
    async fn get_chunk_meta(&self, id: &str) -> Result<Option<ChunkMeta>, CoreError> {
        Ok(self.chunks.read().unwrap().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, doc: &str, vector: Vec<f32>, elements: &[&str]) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            document_id: doc.to_string(),
            vector,
            schema_elements: elements.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn empty_batches_are_noops() {
        let store = MemoryVectorStore::new();
        store.add_embeddings(&[]).await.unwrap();
        store.delete_embeddings(&[]).await.unwrap();
        let hits = store.search_similar(&[1.0, 0.0], 10, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn round_trip_completeness() {
        let store = MemoryVectorStore::new();
        let records = vec![
            record("c1", "d1", vec![1.0, 0.0], &[]),
            record("c2", "d1", vec![0.0, 1.0], &[]),
            record("c3", "d2", vec![0.7, 0.7], &[]),
        ];
        store.add_embeddings(&records).await.unwrap();

        let hits = store.search_similar(&[1.0, 0.0], 10, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(hits.len(), 3);
        for id in ["c1", "c2", "c3"] {
            assert!(ids.contains(&id), "missing {}", id);
        }
        assert_eq!(hits[0].id, "c1");
        for h in &hits {
            assert!((0.0..=1.0).contains(&h.score));
        }
    }

    #[tokio::test]
    async fn deleted_ids_never_surface_again() {
        let store = MemoryVectorStore::new();
        store
            .add_embeddings(&[
                record("c1", "d1", vec![1.0, 0.0], &[]),
                record("c2", "d1", vec![0.9, 0.1], &[]),
            ])
            .await
            .unwrap();

        store
            .delete_embeddings(&["c1".to_string()])
            .await
            .unwrap();
        let hits = store.search_similar(&[1.0, 0.0], 10, None).await.unwrap();
        assert!(hits.iter().all(|h| h.id != "c1"));

        // Deleting again (unknown id) is still a success.
        store
            .delete_embeddings(&["c1".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn re_adding_replaces_the_record() {
        let store = MemoryVectorStore::new();
        store
            .add_embeddings(&[record("c1", "d1", vec![1.0, 0.0], &[])])
            .await
            .unwrap();
        store
            .add_embeddings(&[record("c1", "d1", vec![0.0, 1.0], &[])])
            .await
            .unwrap();
        let v = store.get_embedding("c1").await.unwrap();
        assert_eq!(v, vec![0.0, 1.0]);
        let hits = store.search_similar(&[0.0, 1.0], 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn get_embedding_unknown_id_is_not_found() {
        let store = MemoryVectorStore::new();
        let err = store.get_embedding("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn schema_element_filter_restricts_hits() {
        let store = MemoryVectorStore::new();
        store
            .add_embeddings(&[
                record("c1", "d1", vec![1.0, 0.0], &["E1-1"]),
                record("c2", "d1", vec![1.0, 0.0], &["S1-3"]),
                record("c3", "d2", vec![1.0, 0.0], &["E1-1", "E1-6"]),
            ])
            .await
            .unwrap();

        let filter = SearchFilter {
            document_id: None,
            schema_elements: Some(vec!["E1-1".to_string()]),
        };
        let hits = store
            .search_similar(&[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"c1") && ids.contains(&"c3"));
    }

    #[tokio::test]
    async fn document_filter_restricts_hits() {
        let store = MemoryVectorStore::new();
        store
            .add_embeddings(&[
                record("c1", "d1", vec![1.0, 0.0], &[]),
                record("c2", "d2", vec![1.0, 0.0], &[]),
            ])
            .await
            .unwrap();

        let filter = SearchFilter {
            document_id: Some("d2".to_string()),
            schema_elements: None,
        };
        let hits = store
            .search_similar(&[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c2");
    }
}
