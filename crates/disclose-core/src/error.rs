//! Error taxonomy shared by the retrieval and gap-analysis pipeline.
//!
//! Callers are expected to branch on the variant: configuration and parse
//! errors are addressable by the caller and always surface; backend
//! unavailability distinguishes "cannot embed the query" from "cannot
//! reach the index" so read paths can degrade independently.

use thiserror::Error;

/// Failure modes of the core engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration (bad chunk size/overlap, empty catalogue,
    /// out-of-range threshold). Rejected before any work starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The embedding backend cannot be loaded or invoked. Stored-vector
    /// lookups may still succeed; fresh embeddings cannot be produced.
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The vector index backend is unreachable or timed out.
    #[error("vector store unavailable: {0}")]
    VectorStoreUnavailable(String),

    /// Unknown chunk or document id on a lookup targeting a specific id.
    /// Deletes treat unknown ids as success instead of raising this.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed requirements upload: neither JSON with a `requirements`
    /// field nor any recognizable line pattern.
    #[error("requirements parse error: {0}")]
    Parse(String),
}
