//! `search` and `similar` subcommand runners.

use std::sync::Arc;

use anyhow::Result;

use disclose_core::models::SearchResult;
use disclose_core::search::{SearchParams, SearchService};

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::sqlite_store::SqliteVectorStore;

fn build_service(config: &Config, store: Arc<SqliteVectorStore>) -> Result<SearchService> {
    let provider = create_provider(&config.embedding)?;
    let params = SearchParams {
        candidate_factor: config.search.candidate_factor,
    };
    Ok(SearchService::new(store, provider, params))
}

fn print_results(results: &[SearchResult]) {
    println!("results: {}", results.len());
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} chunk {} ({})",
            i + 1,
            result.relevance_score,
            result.document_filename,
            result.chunk_index,
            result.chunk_id,
        );
        let snippet: String = result.content.chars().take(200).collect();
        println!("   {}", snippet.replace('\n', " "));
    }
}

pub async fn run_search(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    min_score: Option<f64>,
    elements: Option<Vec<String>>,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let model = config.embedding.model.as_deref().unwrap_or("none");
    let store = Arc::new(SqliteVectorStore::new(pool, model));
    let service = build_service(config, store)?;

    let results = service
        .search(
            query,
            top_k.unwrap_or(config.search.default_top_k),
            min_score.unwrap_or(config.search.min_relevance_score),
            elements.as_deref(),
        )
        .await?;
    print_results(&results);
    Ok(())
}

pub async fn run_similar(config: &Config, chunk_id: &str, top_k: Option<usize>) -> Result<()> {
    let pool = db::connect(config).await?;
    let model = config.embedding.model.as_deref().unwrap_or("none");
    let store = Arc::new(SqliteVectorStore::new(pool, model));
    let service = build_service(config, store)?;

    let results = service
        .find_similar(chunk_id, top_k.unwrap_or(config.search.default_top_k))
        .await?;
    print_results(&results);
    Ok(())
}
