use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub gap: GapConfig,
    #[serde(default)]
    pub schemas: SchemasConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_min_relevance")]
    pub min_relevance_score: f64,
    /// Over-fetch multiplier applied before post-filtering.
    #[serde(default = "default_candidate_factor")]
    pub candidate_factor: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            min_relevance_score: default_min_relevance(),
            candidate_factor: default_candidate_factor(),
        }
    }
}

fn default_top_k() -> usize {
    10
}
fn default_min_relevance() -> f64 {
    0.5
}
fn default_candidate_factor() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for HTTP providers (Ollama).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GapConfig {
    /// Best-score threshold above which a schema element counts as matched.
    #[serde(default = "default_gap_threshold")]
    pub threshold: f64,
    /// `lexical` or `semantic`.
    #[serde(default = "default_gap_strategy")]
    pub strategy: String,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            threshold: default_gap_threshold(),
            strategy: default_gap_strategy(),
        }
    }
}

fn default_gap_threshold() -> f64 {
    0.5
}
fn default_gap_strategy() -> String {
    "lexical".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SchemasConfig {
    /// Directory holding `<SCHEMA_TYPE>.json` catalogue overrides.
    pub dir: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.chunk_size");
    }

    // Validate search
    if config.search.default_top_k == 0 {
        anyhow::bail!("search.default_top_k must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.search.min_relevance_score) {
        anyhow::bail!("search.min_relevance_score must be in [0.0, 1.0]");
    }
    if config.search.candidate_factor == 0 {
        anyhow::bail!("search.candidate_factor must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "mock" | "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, mock, openai, ollama, or local.",
            other
        ),
    }
    if matches!(config.embedding.provider.as_str(), "openai" | "ollama") {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    // Validate gap analysis
    if !(0.0..=1.0).contains(&config.gap.threshold) {
        anyhow::bail!("gap.threshold must be in [0.0, 1.0]");
    }
    match config.gap.strategy.as_str() {
        "lexical" | "semantic" => {}
        other => anyhow::bail!(
            "Unknown gap strategy: '{}'. Must be lexical or semantic.",
            other
        ),
    }
    if config.gap.strategy == "semantic" && !config.embedding.is_enabled() {
        anyhow::bail!("gap.strategy = 'semantic' requires an embedding provider");
    }

    Ok(config)
}
