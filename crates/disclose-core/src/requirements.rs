//! Requirements-document normalization.
//!
//! Client requirement uploads arrive in heterogeneous shapes; this module
//! flattens them into an ordered list of [`RequirementStatement`]s for
//! the gap analyzer.
//!
//! Recognized shapes:
//!
//! - **JSON** — an object with a `requirements` array of strings, taken
//!   1:1 in order.
//! - **Numbered text** — lines with a leading `"<digits>. "` marker; the
//!   marker is stripped. If any numbered lines exist, only those lines
//!   become statements.
//! - **Bulleted text** — lines with a leading `"- "` marker, used when no
//!   numbered lines exist.
//! - **Fallback** — plain text with neither marker becomes one statement
//!   per non-blank line. This fallback is deliberate and documented
//!   rather than inferred: free-form uploads are common enough that
//!   rejecting them would push callers into fake numbering.
//!
//! Whitespace-only lines and entries are never emitted. Malformed input
//! (invalid JSON, JSON without the `requirements` field, blank text) is a
//! [`CoreError::Parse`] with enough detail for the caller to fix it. A
//! JSON upload whose `requirements` array is present but empty parses to
//! an empty statement list, which the gap analyzer scores as 0% coverage.

use serde::Deserialize;

use crate::error::CoreError;
use crate::models::RequirementStatement;

/// Declared upload format. There is no content sniffing: the caller
/// states what it sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementsFormat {
    Json,
    Text,
}

#[derive(Deserialize)]
struct RequirementsDoc {
    requirements: Vec<String>,
}

/// Normalize an uploaded requirements document.
pub fn parse_requirements(
    content: &[u8],
    format: RequirementsFormat,
) -> Result<Vec<RequirementStatement>, CoreError> {
    match format {
        RequirementsFormat::Json => parse_json(content),
        RequirementsFormat::Text => parse_text(content),
    }
}

fn parse_json(content: &[u8]) -> Result<Vec<RequirementStatement>, CoreError> {
    let doc: RequirementsDoc = serde_json::from_slice(content).map_err(|e| {
        CoreError::Parse(format!(
            "expected a JSON object with a `requirements` array of strings: {}",
            e
        ))
    })?;

    // A present-but-empty array is a legitimate upload: zero statements,
    // which the gap analyzer reports as 0% coverage.
    Ok(doc
        .requirements
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| RequirementStatement {
            text: text.trim().to_string(),
            source_index: i,
        })
        .collect())
}

fn parse_text(content: &[u8]) -> Result<Vec<RequirementStatement>, CoreError> {
    let text = std::str::from_utf8(content)
        .map_err(|e| CoreError::Parse(format!("requirements text is not valid UTF-8: {}", e)))?;

    let numbered = collect_lines(text, numbered_body);
    if !numbered.is_empty() {
        return Ok(numbered);
    }

    let bulleted = collect_lines(text, bulleted_body);
    if !bulleted.is_empty() {
        return Ok(bulleted);
    }

    // Fallback: one statement per non-blank line.
    let plain = collect_lines(text, |line| {
        let t = line.trim();
        (!t.is_empty()).then_some(t)
    });
    if plain.is_empty() {
        return Err(CoreError::Parse(
            "no requirement statements found: input is empty or whitespace-only".to_string(),
        ));
    }
    Ok(plain)
}

fn collect_lines(
    text: &str,
    recognize: impl Fn(&str) -> Option<&str>,
) -> Vec<RequirementStatement> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            recognize(line).and_then(|body| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| RequirementStatement {
                    text: trimmed.to_string(),
                    source_index: i + 1,
                })
            })
        })
        .collect()
}

/// `"12. Report scope 1 emissions"` → `Some("Report scope 1 emissions")`.
fn numbered_body(line: &str) -> Option<&str> {
    let t = line.trim_start();
    let digits = t.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    t[digits..].strip_prefix(". ")
}

/// `"- Report scope 1 emissions"` → `Some("Report scope 1 emissions")`.
fn bulleted_body(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix("- ")
}
