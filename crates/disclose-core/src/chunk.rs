//! Sliding-window text chunker.
//!
//! Splits extracted document text into fixed-size overlapping windows of
//! **characters** (not bytes, not tokens — the unit is documented and
//! consistent everywhere offsets appear). The window advances by
//! `size - overlap` characters per step, so consecutive chunks share
//! exactly `overlap` characters; the final window may be shorter.
//!
//! Each chunk records its character offsets, a contiguous 0-based index,
//! a fresh UUID, and a SHA-256 hash of its text for staleness detection
//! in the embedding pipeline.
//!
//! # Properties
//!
//! For text of character length `L`, size `s > 0` and overlap
//! `0 <= o < s`, the chunker produces `ceil((L - o) / (s - o))` chunks
//! (1 if `L <= s`, 0 if the text is empty), each at most `s` characters.
//!
//! # Example
//!
//! ```rust
//! use disclose_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("doc-123", "abcdefghij", 4, 2).unwrap();
//! assert_eq!(chunks.len(), 4);
//! assert_eq!(chunks[0].content, "abcd");
//! assert_eq!(chunks[1].content, "cdef");
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::Chunk;

/// Split text into overlapping character windows.
///
/// # Errors
///
/// `size == 0` or `overlap >= size` is a configuration error; no work
/// is done. Empty text yields an empty vec, not an error.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, CoreError> {
    if size == 0 {
        return Err(CoreError::Configuration(
            "chunk size must be > 0".to_string(),
        ));
    }
    if overlap >= size {
        return Err(CoreError::Configuration(format!(
            "chunk overlap {} must be smaller than chunk size {}",
            overlap, size
        )));
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of each character, plus an end sentinel, so windows can
    // be sliced without landing inside a multi-byte sequence.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let total_chars = bounds.len() - 1;

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index: i64 = 0;

    loop {
        let end = (start + size).min(total_chars);
        let piece = &text[bounds[start]..bounds[end]];
        chunks.push(make_chunk(document_id, index, piece, start, end));
        if end == total_chars {
            break;
        }
        start += step;
        index += 1;
    }

    Ok(chunks)
}

/// Create a single [`Chunk`] with a UUID and SHA-256 content hash.
fn make_chunk(document_id: &str, index: i64, content: &str, start: usize, end: usize) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        content: content.to_string(),
        chunk_index: index,
        start_offset: start,
        end_offset: end,
        schema_elements: Vec::new(),
        hash,
        created_at: chrono::Utc::now(),
    }
}
