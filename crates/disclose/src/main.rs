use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use disclose::config::load_config;
use disclose::embedding::create_provider;
use disclose::extract::content_type_for_path;
use disclose::ingest::{delete_document, ingest_document, IngestLocks};
use disclose::sqlite_store::SqliteVectorStore;
use disclose::{db, gap_cmd, migrate, search_cmd};

#[derive(Parser)]
#[command(name = "disclose")]
#[command(about = "Document retrieval and gap analysis for regulatory disclosures")]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, default_value = "./config/disclose.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and run migrations
    Init,
    /// Ingest a document (pdf, docx, txt, md)
    Ingest {
        /// Path to the document
        file: PathBuf,
        /// Re-ingest under an existing document id (replaces its chunks)
        #[arg(long)]
        document_id: Option<String>,
        /// Comma-separated schema-element codes to tag the document with
        #[arg(long)]
        elements: Option<String>,
        /// Override the content type inferred from the file extension
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Semantic search over indexed chunks
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        /// Relevance floor in [0.0, 1.0]
        #[arg(long)]
        min_score: Option<f64>,
        /// Comma-separated schema-element codes to restrict results to
        #[arg(long)]
        elements: Option<String>,
    },
    /// Find chunks similar to an existing chunk
    Similar {
        chunk_id: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Delete a document and its chunks and vectors
    Delete { document_id: String },
    /// Analyze requirements coverage against a schema catalogue
    Gap {
        /// Path to the requirements file
        file: PathBuf,
        /// Requirements format: json or text
        #[arg(long, default_value = "text")]
        format: String,
        /// Schema catalogue key
        #[arg(long, default_value = "EU_ESRS_CSRD")]
        schema: String,
        /// Identifier for this requirements upload (defaults to a UUID)
        #[arg(long)]
        client: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn split_codes(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("database initialized at {}", config.db.path.display());
        }
        Commands::Ingest {
            file,
            document_id,
            elements,
            content_type,
        } => {
            let content_type = match content_type {
                Some(ct) => ct,
                None => content_type_for_path(&file)
                    .with_context(|| {
                        format!("Cannot infer content type for {}", file.display())
                    })?
                    .to_string(),
            };
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document")
                .to_string();
            let schema_elements = split_codes(elements);

            let pool = db::connect(&config).await?;
            let model = config.embedding.model.as_deref().unwrap_or("none");
            let store = SqliteVectorStore::new(pool.clone(), model);
            let provider = create_provider(&config.embedding)?;
            let locks = IngestLocks::new();

            let outcome = ingest_document(
                &config,
                &pool,
                &store,
                &provider,
                &locks,
                &bytes,
                &content_type,
                &filename,
                document_id,
                &schema_elements,
            )
            .await?;
            println!(
                "ingested {} as {} ({} chunks, {} embedded, status {})",
                filename,
                outcome.document_id,
                outcome.chunk_count,
                outcome.embedded_count,
                outcome.status
            );
        }
        Commands::Search {
            query,
            top_k,
            min_score,
            elements,
        } => {
            let elements = elements.map(|raw| split_codes(Some(raw)));
            search_cmd::run_search(&config, &query, top_k, min_score, elements).await?;
        }
        Commands::Similar { chunk_id, top_k } => {
            search_cmd::run_similar(&config, &chunk_id, top_k).await?;
        }
        Commands::Delete { document_id } => {
            let pool = db::connect(&config).await?;
            let locks = IngestLocks::new();
            delete_document(&pool, &locks, &document_id).await?;
            println!("deleted {}", document_id);
        }
        Commands::Gap {
            file,
            format,
            schema,
            client,
            json,
        } => {
            gap_cmd::run_gap(&config, &file, &format, &schema, client, json).await?;
        }
    }

    Ok(())
}
