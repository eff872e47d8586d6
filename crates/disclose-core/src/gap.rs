//! Gap analysis: coverage of a schema catalogue by client requirements.
//!
//! For each [`SchemaElement`] in the catalogue, the analyzer computes the
//! best match score against all requirement statements and calls the
//! element matched when that score exceeds the configured threshold
//! (default 0.5). Coverage is `100 × matched / |catalogue|`, rounded
//! half-up to one decimal place.
//!
//! Two match strategies are supported (the measure is configurable, not
//! fixed — see [`MatchStrategy`]):
//!
//! - **Lexical** (default): the share of the element-description's
//!   tokens that appear in the statement, case-insensitive, split on
//!   non-alphanumeric characters. Pure and deterministic; needs no
//!   embedding backend.
//! - **Semantic**: normalized cosine similarity between provider
//!   embeddings of the statement and the element description. Statements
//!   and descriptions are batch-embedded (one provider call each).
//!
//! The gap path is independent of the vector store; only the semantic
//! strategy touches the embedding provider.

use std::collections::HashSet;
use std::sync::Arc;

use crate::embedding::{cosine_similarity, normalize_similarity, EmbeddingProvider};
use crate::error::CoreError;
use crate::models::{ElementMatch, GapAnalysisReport, RequirementStatement, SchemaElement};

/// Text-similarity measure used to score statements against elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Lexical,
    Semantic,
}

/// Scores schema-element coverage against parsed requirement statements.
pub struct GapAnalyzer {
    threshold: f64,
    strategy: MatchStrategy,
    /// Required for [`MatchStrategy::Semantic`]; unused otherwise.
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl std::fmt::Debug for GapAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GapAnalyzer")
            .field("threshold", &self.threshold)
            .field("strategy", &self.strategy)
            .field("provider", &self.provider.as_ref().map(|p| p.model_name()))
            .finish()
    }
}

impl GapAnalyzer {
    /// Lexical analyzer with the given match threshold.
    pub fn lexical(threshold: f64) -> Result<Self, CoreError> {
        Self::new(threshold, MatchStrategy::Lexical, None)
    }

    /// Semantic analyzer backed by an embedding provider.
    pub fn semantic(
        threshold: f64,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, CoreError> {
        Self::new(threshold, MatchStrategy::Semantic, Some(provider))
    }

    fn new(
        threshold: f64,
        strategy: MatchStrategy,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self, CoreError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CoreError::Configuration(format!(
                "gap threshold {} must be in [0.0, 1.0]",
                threshold
            )));
        }
        if strategy == MatchStrategy::Semantic && provider.is_none() {
            return Err(CoreError::Configuration(
                "semantic gap analysis requires an embedding provider".to_string(),
            ));
        }
        Ok(Self {
            threshold,
            strategy,
            provider,
        })
    }

    /// Score every catalogue element against the statements.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Configuration`] for an empty catalogue (coverage
    ///   would be undefined).
    /// - [`CoreError::EmbeddingUnavailable`] from the semantic strategy
    ///   when the backend is down.
    ///
    /// An empty statement list is valid input: 0.0% coverage, every
    /// element unmatched.
    pub async fn analyze(
        &self,
        requirement_id: &str,
        statements: &[RequirementStatement],
        catalogue: &[SchemaElement],
    ) -> Result<GapAnalysisReport, CoreError> {
        if catalogue.is_empty() {
            return Err(CoreError::Configuration(
                "schema catalogue is empty: coverage is undefined".to_string(),
            ));
        }

        let scores = if statements.is_empty() {
            vec![0.0; catalogue.len()]
        } else {
            match self.strategy {
                MatchStrategy::Lexical => catalogue
                    .iter()
                    .map(|element| best_lexical_score(element, statements))
                    .collect(),
                MatchStrategy::Semantic => {
                    self.semantic_scores(statements, catalogue).await?
                }
            }
        };

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for (element, score) in catalogue.iter().zip(scores) {
            if score > self.threshold {
                matched.push(ElementMatch {
                    element: element.clone(),
                    score,
                });
            } else {
                unmatched.push(element.clone());
            }
        }

        let coverage = 100.0 * matched.len() as f64 / catalogue.len() as f64;

        Ok(GapAnalysisReport {
            requirement_id: requirement_id.to_string(),
            matched_elements: matched,
            unmatched_elements: unmatched,
            coverage_percentage: round_one_decimal(coverage),
        })
    }

    /// One batch-embed call per side, then a dense best-of comparison.
    async fn semantic_scores(
        &self,
        statements: &[RequirementStatement],
        catalogue: &[SchemaElement],
    ) -> Result<Vec<f64>, CoreError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            CoreError::Configuration(
                "semantic gap analysis requires an embedding provider".to_string(),
            )
        })?;

        let statement_texts: Vec<String> = statements.iter().map(|s| s.text.clone()).collect();
        let element_texts: Vec<String> = catalogue
            .iter()
            .map(|e| format!("{} {}", e.code, e.description))
            .collect();

        let statement_vecs = provider.embed_batch(&statement_texts).await?;
        let element_vecs = provider.embed_batch(&element_texts).await?;

        Ok(element_vecs
            .iter()
            .map(|ev| {
                statement_vecs
                    .iter()
                    .map(|sv| normalize_similarity(cosine_similarity(ev, sv)))
                    .fold(0.0f64, f64::max)
            })
            .collect())
    }
}

/// Best lexical score of one element over all statements: the largest
/// share of the element-description's tokens found in a statement.
fn best_lexical_score(element: &SchemaElement, statements: &[RequirementStatement]) -> f64 {
    let element_tokens = tokenize(&element.description);
    if element_tokens.is_empty() {
        return 0.0;
    }
    statements
        .iter()
        .map(|statement| {
            let statement_tokens = tokenize(&statement.text);
            let shared = element_tokens
                .iter()
                .filter(|t| statement_tokens.contains(*t))
                .count();
            shared as f64 / element_tokens.len() as f64
        })
        .fold(0.0f64, f64::max)
}

/// Lowercased alphanumeric tokens of at least two characters.
fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_string())
        .collect()
}

/// Round to one decimal place, half-up (`f64::round` is half-away-from-
/// zero, which is half-up for the non-negative percentages here).
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn statement(text: &str) -> RequirementStatement {
        RequirementStatement {
            text: text.to_string(),
            source_index: 0,
        }
    }

    fn element(code: &str, description: &str) -> SchemaElement {
        SchemaElement {
            code: code.to_string(),
            description: description.to_string(),
        }
    }

    fn catalogue() -> Vec<SchemaElement> {
        vec![
            element("E1-1", "Transition plan for climate change mitigation"),
            element("E1-6", "Gross scopes greenhouse gas emissions"),
            element("S1-1", "Policies related to own workforce"),
        ]
    }

    #[tokio::test]
    async fn empty_statements_yield_zero_coverage_all_unmatched() {
        let analyzer = GapAnalyzer::lexical(0.5).unwrap();
        let cat = catalogue();
        let report = analyzer.analyze("req-1", &[], &cat).await.unwrap();
        assert_eq!(report.coverage_percentage, 0.0);
        assert!(report.matched_elements.is_empty());
        assert_eq!(report.unmatched_elements, cat);
    }

    #[tokio::test]
    async fn empty_catalogue_is_configuration_error() {
        let analyzer = GapAnalyzer::lexical(0.5).unwrap();
        let err = analyzer
            .analyze("req-1", &[statement("anything")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[tokio::test]
    async fn full_coverage_is_one_hundred_percent() {
        let analyzer = GapAnalyzer::lexical(0.5).unwrap();
        let cat = catalogue();
        let statements = vec![
            statement("Our transition plan addresses climate change mitigation"),
            statement("We disclose gross scopes greenhouse gas emissions yearly"),
            statement("Policies related to our own workforce are published"),
        ];
        let report = analyzer.analyze("req-1", &statements, &cat).await.unwrap();
        assert_eq!(report.coverage_percentage, 100.0);
        assert_eq!(report.matched_elements.len(), 3);
        assert!(report.unmatched_elements.is_empty());
        for m in &report.matched_elements {
            assert!(m.score > 0.5);
        }
    }

    #[tokio::test]
    async fn partial_coverage_rounds_to_one_decimal() {
        let analyzer = GapAnalyzer::lexical(0.5).unwrap();
        let cat = catalogue();
        let statements = vec![statement(
            "We disclose gross scopes greenhouse gas emissions yearly",
        )];
        let report = analyzer.analyze("req-1", &statements, &cat).await.unwrap();
        // 1 of 3 matched: 33.333…% rounds to 33.3.
        assert_eq!(report.coverage_percentage, 33.3);
        assert_eq!(report.matched_elements.len(), 1);
        assert_eq!(report.matched_elements[0].element.code, "E1-6");
        assert_eq!(report.unmatched_elements.len(), 2);
    }

    #[tokio::test]
    async fn unmatched_preserves_catalogue_order() {
        let analyzer = GapAnalyzer::lexical(0.5).unwrap();
        let cat = catalogue();
        let report = analyzer.analyze("req-1", &[], &cat).await.unwrap();
        let codes: Vec<&str> = report
            .unmatched_elements
            .iter()
            .map(|e| e.code.as_str())
            .collect();
        assert_eq!(codes, vec!["E1-1", "E1-6", "S1-1"]);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        assert!(matches!(
            GapAnalyzer::lexical(1.5).unwrap_err(),
            CoreError::Configuration(_)
        ));
    }

    #[test]
    fn lexical_score_is_share_of_element_tokens() {
        let el = element("E1-6", "gross greenhouse gas emissions");
        let score = best_lexical_score(&el, &[statement("report greenhouse gas totals")]);
        // 2 of 4 element tokens covered.
        assert!((score - 0.5).abs() < 1e-9);
    }

    /// Deterministic two-dimensional provider for the semantic path:
    /// texts mentioning "climate" embed along one axis, others along the
    /// orthogonal axis.
    struct AxisProvider;

    #[async_trait]
    impl EmbeddingProvider for AxisProvider {
        fn model_name(&self) -> &str {
            "axis"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.to_lowercase().contains("climate") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn semantic_strategy_scores_with_provider_embeddings() {
        let analyzer = GapAnalyzer::semantic(0.9, Arc::new(AxisProvider)).unwrap();
        let cat = vec![
            element("E1-1", "climate change transition plan"),
            element("S1-1", "workforce policies"),
        ];
        let statements = vec![statement("our climate commitments")];
        let report = analyzer.analyze("req-1", &statements, &cat).await.unwrap();
        assert_eq!(report.matched_elements.len(), 1);
        assert_eq!(report.matched_elements[0].element.code, "E1-1");
        assert_eq!(report.coverage_percentage, 50.0);
    }
}
