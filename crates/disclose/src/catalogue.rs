//! Schema-element catalogues.
//!
//! Supplies the ordered [`SchemaElement`] list for a schema-type key
//! (e.g. `EU_ESRS_CSRD`). Built-in catalogues cover the common taxonomies;
//! a `schemas.dir` config entry lets deployments override or add
//! catalogues with `<KEY>.json` files of the shape
//! `{"elements": [{"code": "...", "description": "..."}]}`.
//!
//! Catalogues are read-only inputs to the gap analyzer.

use anyhow::{Context, Result};
use serde::Deserialize;

use disclose_core::models::SchemaElement;

use crate::config::Config;

/// ESRS disclosure requirements under the EU CSRD (abbreviated set).
const EU_ESRS_CSRD: &[(&str, &str)] = &[
    ("E1-1", "Transition plan for climate change mitigation"),
    ("E1-2", "Policies related to climate change mitigation and adaptation"),
    ("E1-3", "Actions and resources in relation to climate change policies"),
    ("E1-4", "Targets related to climate change mitigation and adaptation"),
    ("E1-5", "Energy consumption and mix"),
    ("E1-6", "Gross scopes 1, 2, 3 and total greenhouse gas emissions"),
    ("E2-1", "Policies related to pollution"),
    ("E2-4", "Pollution of air, water and soil"),
    ("E3-1", "Policies related to water and marine resources"),
    ("E3-4", "Water consumption"),
    ("E4-1", "Transition plan and consideration of biodiversity and ecosystems"),
    ("E5-1", "Policies related to resource use and circular economy"),
    ("E5-5", "Resource outflows"),
    ("S1-1", "Policies related to own workforce"),
    ("S1-6", "Characteristics of the undertaking's employees"),
    ("S2-1", "Policies related to value chain workers"),
    ("S3-1", "Policies related to affected communities"),
    ("S4-1", "Policies related to consumers and end-users"),
    ("G1-1", "Business conduct policies and corporate culture"),
    ("G1-4", "Incidents of corruption or bribery"),
];

/// UK sustainability-related disclosures (TCFD-aligned pillars).
const UK_SRD: &[(&str, &str)] = &[
    ("GOV-1", "Board oversight of climate-related risks and opportunities"),
    ("GOV-2", "Management's role in assessing and managing climate-related risks"),
    ("STR-1", "Climate-related risks and opportunities over the short, medium and long term"),
    ("STR-2", "Impact of climate-related risks on business model and strategy"),
    ("STR-3", "Resilience of the strategy under different climate scenarios"),
    ("RSK-1", "Processes for identifying and assessing climate-related risks"),
    ("MET-1", "Metrics used to assess climate-related risks and opportunities"),
    ("MET-2", "Scope 1, 2 and 3 greenhouse gas emissions"),
];

#[derive(Deserialize)]
struct CatalogueFile {
    elements: Vec<SchemaElement>,
}

/// Load the ordered catalogue for a schema-type key.
///
/// A `schemas.dir` override file wins over the built-in list of the
/// same key; unknown keys with no override are an error naming the
/// available catalogues.
pub fn load_catalogue(config: &Config, schema_type: &str) -> Result<Vec<SchemaElement>> {
    if let Some(ref dir) = config.schemas.dir {
        let path = dir.join(format!("{}.json", schema_type));
        if path.is_file() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read catalogue file: {}", path.display()))?;
            let file: CatalogueFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse catalogue file: {}", path.display()))?;
            if file.elements.is_empty() {
                anyhow::bail!("catalogue file {} has no elements", path.display());
            }
            return Ok(file.elements);
        }
    }

    let builtin = match schema_type {
        "EU_ESRS_CSRD" => EU_ESRS_CSRD,
        "UK_SRD" => UK_SRD,
        other => anyhow::bail!(
            "Unknown schema type: '{}'. Built-in catalogues: EU_ESRS_CSRD, UK_SRD.",
            other
        ),
    };

    Ok(builtin
        .iter()
        .map(|(code, description)| SchemaElement {
            code: code.to_string(),
            description: description.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DbConfig};

    fn config(dir: Option<std::path::PathBuf>) -> Config {
        Config {
            db: DbConfig {
                path: "unused.sqlite".into(),
            },
            chunking: Default::default(),
            search: Default::default(),
            embedding: Default::default(),
            gap: Default::default(),
            schemas: crate::config::SchemasConfig { dir },
        }
    }

    #[test]
    fn builtin_catalogues_are_ordered_and_nonempty() {
        let cfg = config(None);
        let esrs = load_catalogue(&cfg, "EU_ESRS_CSRD").unwrap();
        assert_eq!(esrs.len(), 20);
        assert_eq!(esrs[0].code, "E1-1");
        let srd = load_catalogue(&cfg, "UK_SRD").unwrap();
        assert_eq!(srd.len(), 8);
        assert_eq!(srd[0].code, "GOV-1");
    }

    #[test]
    fn unknown_schema_type_is_an_error() {
        let cfg = config(None);
        assert!(load_catalogue(&cfg, "US_SEC").is_err());
    }

    #[test]
    fn file_override_wins_over_builtin() {
        let tmp = std::env::temp_dir().join(format!("disclose-cat-{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();
        std::fs::write(
            tmp.join("EU_ESRS_CSRD.json"),
            r#"{"elements": [{"code": "X-1", "description": "custom element"}]}"#,
        )
        .unwrap();
        let cfg = config(Some(tmp.clone()));
        let cat = load_catalogue(&cfg, "EU_ESRS_CSRD").unwrap();
        assert_eq!(cat.len(), 1);
        assert_eq!(cat[0].code, "X-1");
        std::fs::remove_dir_all(&tmp).ok();
    }
}
