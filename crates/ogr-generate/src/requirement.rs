//! Natural-language requirement records.

use serde::{Deserialize, Serialize};

/// One requirement statement from the input corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Stable identifier, e.g. "REQ-007"
    pub identifier: String,
    /// Short title
    #[serde(default)]
    pub title: String,
    /// Full requirement text
    pub text: String,
    /// Optional controlled-language rendering of the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boilerplate: Option<String>,
}

impl Requirement {
    /// Build a requirement from its identifier and text.
    #[inline]
    pub fn new(identifier: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: String::new(),
            text: text.into(),
            boilerplate: None,
        }
    }
}

/// Parse one requirement per line of JSON. Blank lines are skipped;
/// a malformed line aborts the load with the line number.
pub fn from_jsonl(input: &str) -> Result<Vec<Requirement>, RequirementError> {
    let mut requirements = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let requirement: Requirement =
            serde_json::from_str(line).map_err(|source| RequirementError::MalformedLine {
                line: idx + 1,
                source,
            })?;
        requirements.push(requirement);
    }
    Ok(requirements)
}

/// Split requirements into fixed-size batches, preserving order.
/// A zero size yields a single batch.
#[must_use]
pub fn chunk(requirements: &[Requirement], size: usize) -> Vec<Vec<Requirement>> {
    if requirements.is_empty() {
        return Vec::new();
    }
    if size == 0 {
        return vec![requirements.to_vec()];
    }
    requirements.chunks(size).map(<[Requirement]>::to_vec).collect()
}

/// Errors loading the requirement corpus.
#[derive(Debug, thiserror::Error)]
pub enum RequirementError {
    /// A line failed to parse as a requirement record
    #[error("malformed requirement on line {line}: {source}")]
    MalformedLine {
        /// 1-based line number
        line: usize,
        /// Underlying JSON error
        source: serde_json::Error,
    },
}
