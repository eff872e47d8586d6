//! Search service: query embedding, relevance filtering, and ranking.
//!
//! Orchestrates an [`EmbeddingProvider`] and a [`SearchBackend`] into the
//! two retrieval operations the query layer exposes. The service owns
//! no state beyond its collaborators; every call is request-scoped.
//!
//! # Algorithm
//!
//! 1. Embed the query (a backend failure here fails the call loudly —
//!    there is no meaningful "empty" answer for a query that could not
//!    even be embedded).
//! 2. Over-fetch `top_k × candidate_factor` neighbors from the store,
//!    restricted to the schema-element filter when given, to leave room
//!    for post-filtering.
//! 3. Discard hits below `min_relevance_score`.
//! 4. Resolve surviving ids to chunk metadata; ids whose chunk no longer
//!    exists are dropped (a completed delete must never leak back into
//!    results).
//! 5. Sort by score descending, ties broken by ascending `chunk_index`
//!    then chunk id for determinism, and truncate to `top_k`.
//!
//! A query that embeds successfully but matches nothing returns `Ok` with
//! an empty vec — "nothing found" is a legitimate answer, not an error.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::CoreError;
use crate::models::SearchResult;
use crate::store::{ScoredId, SearchBackend, SearchFilter};

/// Retrieval tuning parameters, decoupled from application config.
/// The relevance floor is per-call; see [`SearchService::search`].
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Over-fetch multiplier applied before post-filtering.
    pub candidate_factor: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            candidate_factor: 4,
        }
    }
}

/// The query-side facade over embedding provider + vector store.
pub struct SearchService {
    store: Arc<dyn SearchBackend>,
    provider: Arc<dyn EmbeddingProvider>,
    params: SearchParams,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn SearchBackend>,
        provider: Arc<dyn EmbeddingProvider>,
        params: SearchParams,
    ) -> Self {
        Self {
            store,
            provider,
            params,
        }
    }

    /// Semantic search over all indexed chunks.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Configuration`] for `top_k == 0` or a relevance
    ///   floor outside `[0, 1]`.
    /// - [`CoreError::EmbeddingUnavailable`] when the query cannot be
    ///   embedded.
    /// - [`CoreError::VectorStoreUnavailable`] when the index backend
    ///   cannot be reached.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_relevance_score: f64,
        schema_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>, CoreError> {
        if top_k == 0 {
            return Err(CoreError::Configuration("top_k must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&min_relevance_score) {
            return Err(CoreError::Configuration(format!(
                "min_relevance_score {} must be in [0.0, 1.0]",
                min_relevance_score
            )));
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.provider.embed(query).await?;

        let filter = schema_filter.map(|elements| SearchFilter {
            document_id: None,
            schema_elements: Some(elements.to_vec()),
        });
        let fetch = self.candidate_count(top_k);
        let hits = self
            .store
            .search_similar(&query_vec, fetch, filter.as_ref())
            .await?;

        self.resolve(hits, min_relevance_score, top_k, None).await
    }

    /// More-like-this: search from a chunk's own stored vector,
    /// excluding the source chunk from results.
    ///
    /// Works even when the embedding backend is down, since the vector
    /// is read from the store rather than freshly computed.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when `chunk_id` has no stored vector.
    pub async fn find_similar(
        &self,
        chunk_id: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, CoreError> {
        if top_k == 0 {
            return Err(CoreError::Configuration("top_k must be > 0".to_string()));
        }

        let vector = self.store.get_embedding(chunk_id).await?;
        // +1 so the excluded source chunk does not eat a result slot.
        let fetch = self.candidate_count(top_k) + 1;
        let hits = self.store.search_similar(&vector, fetch, None).await?;

        self.resolve(hits, 0.0, top_k, Some(chunk_id)).await
    }

    fn candidate_count(&self, top_k: usize) -> usize {
        top_k
            .saturating_mul(self.params.candidate_factor)
            .max(top_k)
    }

    /// Apply the relevance floor, drop stale ids, enrich, rank, truncate.
    async fn resolve(
        &self,
        hits: Vec<ScoredId>,
        min_relevance_score: f64,
        top_k: usize,
        exclude_id: Option<&str>,
    ) -> Result<Vec<SearchResult>, CoreError> {
        let mut results = Vec::new();
        for hit in hits {
            if hit.score < min_relevance_score {
                continue;
            }
            if exclude_id == Some(hit.id.as_str()) {
                continue;
            }
            if let Some(meta) = self.store.get_chunk_meta(&hit.id).await? {
                results.push(SearchResult {
                    chunk_id: meta.chunk_id,
                    document_id: meta.document_id,
                    content: meta.content,
                    chunk_index: meta.chunk_index,
                    relevance_score: hit.score,
                    document_filename: meta.document_filename,
                });
            }
        }

        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        results.truncate(top_k);

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sha2::{Digest, Sha256};

    use crate::chunk::chunk_text;
    use crate::store::memory::MemoryVectorStore;
    use crate::store::{EmbeddingRecord, VectorStore};

    /// Deterministic offline provider: hashed bag-of-words vectors.
    /// Identical text embeds to the identical vector, so exact-content
    /// queries rank their chunk first.
    struct HashProvider {
        dims: usize,
    }

    impl HashProvider {
        fn vectorize(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0f32; self.dims];
            for token in text
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
            {
                let digest = Sha256::digest(token.as_bytes());
                let idx = usize::from(digest[0]) % self.dims;
                v[idx] += 1.0;
            }
            v
        }
    }

    #[async_trait]
    impl EmbeddingProvider for HashProvider {
        fn model_name(&self) -> &str {
            "hash-bag"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
            Ok(texts.iter().map(|t| self.vectorize(t)).collect())
        }
    }

    /// Provider that is always down.
    struct DownProvider;

    #[async_trait]
    impl EmbeddingProvider for DownProvider {
        fn model_name(&self) -> &str {
            "down"
        }
        fn dims(&self) -> usize {
            0
        }
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
            Err(CoreError::EmbeddingUnavailable("backend offline".to_string()))
        }
    }

    async fn seed(store: &MemoryVectorStore, provider: &HashProvider) -> Vec<String> {
        let texts = [
            "greenhouse gas emissions across scope one and scope two",
            "water consumption and marine resources in coastal plants",
            "board diversity and governance oversight of sustainability",
        ];
        let mut chunk_ids = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let doc_id = format!("doc-{}", i);
            let mut chunks = chunk_text(&doc_id, text, 200, 0).unwrap();
            chunks[0].schema_elements = vec![format!("E{}-1", i + 1)];
            store.register_chunks(&chunks, &format!("report-{}.pdf", i));
            let records: Vec<EmbeddingRecord> = chunks
                .iter()
                .map(|c| EmbeddingRecord {
                    id: c.id.clone(),
                    document_id: c.document_id.clone(),
                    vector: provider.vectorize(&c.content),
                    schema_elements: c.schema_elements.clone(),
                })
                .collect();
            store.add_embeddings(&records).await.unwrap();
            chunk_ids.push(chunks[0].id.clone());
        }
        chunk_ids
    }

    fn service(store: Arc<MemoryVectorStore>, provider: Arc<dyn EmbeddingProvider>) -> SearchService {
        SearchService::new(store, provider, SearchParams::default())
    }

    #[tokio::test]
    async fn exact_content_query_ranks_its_chunk_first() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(HashProvider { dims: 64 });
        let ids = seed(&store, &provider).await;

        let svc = service(store, provider);
        let results = svc
            .search(
                "greenhouse gas emissions across scope one and scope two",
                3,
                0.0,
                None,
            )
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, ids[0]);
        assert!((results[0].relevance_score - 1.0).abs() < 1e-6);
        assert_eq!(results[0].document_filename, "report-0.pdf");
        for pair in results.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
    }

    #[tokio::test]
    async fn exact_chunk_content_wins_within_one_document() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(HashProvider { dims: 64 });

        let text = "emissions intensity per revenue unit \
                    water withdrawal in stressed basins \
                    board remuneration linked to targets";
        let chunks = chunk_text("doc-x", text, 40, 0).unwrap();
        assert_eq!(chunks.len(), 3);
        store.register_chunks(&chunks, "filing.pdf");
        let records: Vec<EmbeddingRecord> = chunks
            .iter()
            .map(|c| EmbeddingRecord {
                id: c.id.clone(),
                document_id: c.document_id.clone(),
                vector: provider.vectorize(&c.content),
                schema_elements: vec![],
            })
            .collect();
        store.add_embeddings(&records).await.unwrap();

        let query = chunks[1].content.clone();
        let svc = service(store, provider);
        let results = svc.search(&query, 3, 0.0, None).await.unwrap();
        assert_eq!(results[0].chunk_id, chunks[1].id);
        for r in &results[1..] {
            assert!(r.relevance_score <= results[0].relevance_score);
        }
    }

    #[tokio::test]
    async fn relevance_floor_is_respected() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(HashProvider { dims: 64 });
        seed(&store, &provider).await;

        let svc = service(store, provider);
        let results = svc
            .search("greenhouse gas emissions", 10, 0.9, None)
            .await
            .unwrap();
        for r in &results {
            assert!(r.relevance_score >= 0.9);
        }
    }

    #[tokio::test]
    async fn no_match_above_floor_is_empty_success() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(HashProvider { dims: 64 });
        seed(&store, &provider).await;

        let svc = service(store, provider);
        let results = svc
            .search("entirely unrelated quantum chromodynamics", 5, 0.999, None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn embedding_outage_fails_loudly() {
        let store = Arc::new(MemoryVectorStore::new());
        let svc = service(store, Arc::new(DownProvider));
        let err = svc.search("anything", 5, 0.0, None).await.unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn schema_filter_restricts_results() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(HashProvider { dims: 64 });
        seed(&store, &provider).await;

        let svc = service(store, provider);
        let filter = vec!["E2-1".to_string()];
        let results = svc
            .search("water consumption", 10, 0.0, Some(&filter))
            .await
            .unwrap();
        assert!(!results.is_empty());
        for r in &results {
            assert_eq!(r.document_id, "doc-1");
        }
    }

    #[tokio::test]
    async fn find_similar_excludes_the_source_chunk() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(HashProvider { dims: 64 });
        let ids = seed(&store, &provider).await;

        // find_similar reads the stored vector, so a dead embedding
        // backend must not matter.
        let svc = service(store, Arc::new(DownProvider));
        let results = svc.find_similar(&ids[0], 5).await.unwrap();
        assert!(results.iter().all(|r| r.chunk_id != ids[0]));
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn find_similar_unknown_chunk_is_not_found() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(HashProvider { dims: 64 });
        seed(&store, &provider).await;

        let svc = service(store, provider);
        let err = svc.find_similar("missing-chunk", 5).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleted_chunks_never_come_back() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(HashProvider { dims: 64 });
        let ids = seed(&store, &provider).await;

        store
            .delete_embeddings(&[ids[0].clone()])
            .await
            .unwrap();

        let svc = service(store, provider);
        let results = svc
            .search(
                "greenhouse gas emissions across scope one and scope two",
                10,
                0.0,
                None,
            )
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.chunk_id != ids[0]));
    }

    #[tokio::test]
    async fn zero_top_k_is_configuration_error() {
        let store = Arc::new(MemoryVectorStore::new());
        let svc = service(store, Arc::new(HashProvider { dims: 8 }));
        let err = svc.search("q", 0, 0.0, None).await.unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
        let err = svc.search("q", 5, 1.5, None).await.unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }
}
