//! Constraint violations and their canonical form.
//!
//! Validators produce fresh [`Violation`] records each iteration.
//! Canonicalization derives a comparable form used for prompt text and the
//! cross-iteration "no progress" check: equality is structural and excludes
//! the free-text message, so reworded validator output cannot fake progress.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a violation blocks conformance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be repaired before the graph conforms
    Hard,
    /// Advisory; promoted to patches only by explicit configuration
    Soft,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hard => f.write_str("hard"),
            Self::Soft => f.write_str("soft"),
        }
    }
}

/// One raw constraint failure as reported by a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Entity the constraint failed on
    pub focus: Option<String>,
    /// Relation path that failed
    pub path: Option<String>,
    /// Human-readable description
    pub message: String,
    /// Identifier of the originating constraint
    pub constraint: String,
    /// Severity class
    pub severity: Severity,
    /// What the constraint expected, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// What was actually observed, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
}

/// Deterministic, comparable form of a violation.
///
/// Equality and hashing cover only the structural fields; the rendered
/// text is derived from them and carries no iteration-varying data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalViolation {
    /// Focus entity, defaulted when the validator omitted it
    pub focus: String,
    /// Failing path, defaulted when the validator omitted it
    pub path: String,
    /// Originating constraint identifier
    pub constraint: String,
    /// Severity class
    pub severity: Severity,
    /// Expected value, empty when unknown
    pub expected: String,
    /// Observed value, empty when unknown
    pub observed: String,
}

impl CanonicalViolation {
    /// Deterministic one-line rendering for reports and prompts.
    #[must_use]
    pub fn render(&self) -> String {
        let mut line = format!(
            "[{}] focus={} path={} constraint={}",
            self.severity, self.focus, self.path, self.constraint
        );
        if !self.expected.is_empty() {
            line.push_str(&format!(" expected={}", self.expected));
        }
        if !self.observed.is_empty() {
            line.push_str(&format!(" observed={}", self.observed));
        }
        line
    }
}

/// Fallback focus when the validator reported none.
pub const UNKNOWN_FOCUS: &str = "atm:UnknownFocus";
/// Fallback path when the validator reported none.
pub const FALLBACK_PATH: &str = "rdfs:comment";

/// Map a raw violation to its canonical form. Pure: identical input fields
/// give identical output regardless of call order or iteration index.
#[must_use]
pub fn canonicalize(violation: &Violation) -> CanonicalViolation {
    CanonicalViolation {
        focus: violation
            .focus
            .clone()
            .unwrap_or_else(|| UNKNOWN_FOCUS.to_string()),
        path: violation
            .path
            .clone()
            .unwrap_or_else(|| FALLBACK_PATH.to_string()),
        constraint: violation.constraint.clone(),
        severity: violation.severity,
        expected: violation.expected.clone().unwrap_or_default(),
        observed: violation.observed.clone().unwrap_or_default(),
    }
}

/// Render a full violation report, one line per canonical violation.
#[must_use]
pub fn render_report(violations: &[CanonicalViolation]) -> String {
    if violations.is_empty() {
        return "conforms\n".to_string();
    }
    let mut out = String::new();
    for violation in violations {
        out.push_str(&violation.render());
        out.push('\n');
    }
    out
}
