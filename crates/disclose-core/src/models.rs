//! Core data models used throughout Disclose.
//!
//! These types represent the chunks, search results, requirement
//! statements, and gap-analysis reports that flow through the ingestion
//! and retrieval pipeline. Everything returned across the crate boundary
//! is plain serializable data — no live handles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bounded window of a document's text — the atomic retrieval unit.
///
/// Offsets are **character** positions into the extracted document text
/// (not bytes), so they survive multi-byte UTF-8 content. `chunk_index`
/// is contiguous from 0 and unique per document.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk UUID.
    pub id: String,
    /// Parent document id.
    pub document_id: String,
    /// The chunk's text content.
    pub content: String,
    /// 0-based ordinal within the document.
    pub chunk_index: i64,
    /// Character offset of the first character, inclusive.
    pub start_offset: usize,
    /// Character offset one past the last character, exclusive.
    pub end_offset: usize,
    /// Schema-element tags inherited from the document (e.g. `"E1-1"`).
    pub schema_elements: Vec<String>,
    /// SHA-256 of `content`, used for embedding staleness detection.
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

/// A search result produced per query. Transient, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub document_id: String,
    /// Text of the matching chunk.
    pub content: String,
    /// Ordinal of the chunk within its document (ties in score are
    /// broken by ascending index for determinism).
    pub chunk_index: i64,
    /// Normalized similarity in `[0.0, 1.0]`.
    pub relevance_score: f64,
    pub document_filename: String,
}

/// One normalized client requirement, produced by the requirements
/// parser and consumed immediately by the gap analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementStatement {
    pub text: String,
    /// Provenance: 1-based line number for text uploads, 0-based array
    /// index for JSON uploads.
    pub source_index: usize,
}

/// A single disclosure requirement from a regulatory taxonomy
/// (e.g. ESRS `"E1-1"`). Read-only input to the gap analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaElement {
    pub code: String,
    pub description: String,
}

/// A schema element matched by at least one requirement statement,
/// with the best score achieved.
#[derive(Debug, Clone, Serialize)]
pub struct ElementMatch {
    pub element: SchemaElement,
    /// Best match score over all statements, in `[0.0, 1.0]`.
    pub score: f64,
}

/// Coverage report for one requirements upload against a schema
/// catalogue.
#[derive(Debug, Clone, Serialize)]
pub struct GapAnalysisReport {
    /// Caller-supplied identifier for the requirements upload.
    pub requirement_id: String,
    /// Elements whose best score exceeded the threshold.
    pub matched_elements: Vec<ElementMatch>,
    /// Elements no statement covered, in catalogue order.
    pub unmatched_elements: Vec<SchemaElement>,
    /// `100 × matched / catalogue size`, rounded half-up to one decimal.
    pub coverage_percentage: f64,
}
