//! `gap` subcommand runner: parse a requirements upload, run coverage
//! analysis against a schema catalogue, print the report.

use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;

use disclose_core::gap::GapAnalyzer;
use disclose_core::requirements::{parse_requirements, RequirementsFormat};

use crate::catalogue::load_catalogue;
use crate::config::Config;
use crate::embedding::create_provider;

pub async fn run_gap(
    config: &Config,
    file: &Path,
    format: &str,
    schema_type: &str,
    client: Option<String>,
    json_output: bool,
) -> Result<()> {
    let format = match format {
        "json" => RequirementsFormat::Json,
        "text" => RequirementsFormat::Text,
        other => anyhow::bail!("Unknown requirements format: '{}'. Must be json or text.", other),
    };

    let content = std::fs::read(file)
        .with_context(|| format!("Failed to read requirements file: {}", file.display()))?;
    let statements = parse_requirements(&content, format)?;
    tracing::debug!(statements = statements.len(), "parsed requirements upload");

    let catalogue = load_catalogue(config, schema_type)?;

    let analyzer = match config.gap.strategy.as_str() {
        "semantic" => GapAnalyzer::semantic(config.gap.threshold, create_provider(&config.embedding)?)?,
        _ => GapAnalyzer::lexical(config.gap.threshold)?,
    };

    let requirement_id = client.unwrap_or_else(|| Uuid::new_v4().to_string());
    let report = analyzer
        .analyze(&requirement_id, &statements, &catalogue)
        .await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("requirement set: {}", report.requirement_id);
    println!("schema: {} ({} elements)", schema_type, catalogue.len());
    println!("coverage: {}%", report.coverage_percentage);
    println!("matched: {}", report.matched_elements.len());
    for m in &report.matched_elements {
        println!("  [{:.3}] {} {}", m.score, m.element.code, m.element.description);
    }
    println!("unmatched: {}", report.unmatched_elements.len());
    for e in &report.unmatched_elements {
        println!("  {} {}", e.code, e.description);
    }
    Ok(())
}
