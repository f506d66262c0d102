//! Patch synthesis.
//!
//! Two producers feed one deduplicated plan: canonical violations, and
//! failed competency checks via an ordered pattern heuristic. The heuristic
//! trades precision for liveness: a failing check always yields some
//! actionable signal, even if it is only a guessed subclass pairing.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use ogr_graph::TermRegistry;

use crate::competency::CompetencyOutcome;
use crate::violation::{CanonicalViolation, Severity};

/// The closed set of corrective actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatchAction {
    /// Add a property assertion on the subject
    #[serde(rename = "addProperty")]
    AddProperty,
    /// Add a subclass axiom between two classes
    #[serde(rename = "addSubclass")]
    AddSubclass,
}

/// One proposed corrective action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// What to do
    pub action: PatchAction,
    /// Entity to repair
    pub subject: String,
    /// Relation to assert
    pub predicate: String,
    /// Object of the assertion: a class, datatype, or value hint
    pub object: String,
    /// Originating message, for the audit trail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Which producer emitted the patch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Severity carried from the violation, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl Patch {
    /// Identity key used for dedup and the cross-iteration stability check.
    #[inline]
    #[must_use]
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.subject, &self.predicate, &self.object)
    }
}

/// Structural equality of two patch plans by identity key, ignoring
/// messages. Both plans are expected to be already sorted.
#[must_use]
pub fn plans_equal(a: &[Patch], b: &[Patch]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.key() == y.key() && x.action == y.action)
}

fn domain_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z][\w-]*:[A-Za-z_][\w.-]*)\s+rdfs:(domain|range)\s+([A-Za-z][\w-]*:[A-Za-z_][\w.-]*)")
            .expect("static regex")
    })
}

fn subclass_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z][\w-]*:[A-Za-z_][\w.-]*)\s+rdfs:subClassOf\s+([A-Za-z][\w-]*:[A-Za-z_][\w.-]*)")
            .expect("static regex")
    })
}

fn expects_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*#\s*expects:\s*(\S+)\s+(\S+)\s+(\S+)\s*$").expect("static regex"))
}

/// Synthesize patches from canonical violations.
///
/// Hard violations only, unless none exist and `promote_soft` is set, in
/// which case soft violations are promoted so the loop can still make
/// progress. One patch per `(focus, path, value)`; the object falls back
/// through the registry's range hint, the violation's expected value, and
/// finally `xsd:string`.
#[must_use]
pub fn from_violations(
    violations: &[CanonicalViolation],
    registry: &TermRegistry,
    promote_soft: bool,
) -> Vec<Patch> {
    let mut selected: Vec<&CanonicalViolation> = violations
        .iter()
        .filter(|v| v.severity == Severity::Hard)
        .collect();
    if selected.is_empty() && promote_soft {
        selected = violations
            .iter()
            .filter(|v| v.severity == Severity::Soft)
            .collect();
    }

    let mut patches = Vec::new();
    for violation in selected {
        let object = registry
            .range_of(&violation.path)
            .map(str::to_string)
            .or_else(|| {
                // only vocabulary terms qualify; counts like "1" do not
                violation
                    .expected
                    .contains(':')
                    .then(|| violation.expected.clone())
            })
            .unwrap_or_else(|| "xsd:string".to_string());
        patches.push(Patch {
            action: PatchAction::AddProperty,
            subject: violation.focus.clone(),
            predicate: violation.path.clone(),
            object,
            message: Some(violation.render()),
            source: Some(violation.constraint.clone()),
            severity: Some(violation.severity),
        });
    }
    patches
}

/// Synthesize patches from failed competency outcomes.
///
/// Ordered fallback per failing query: an explicit `# expects: S P O`
/// annotation wins outright; else a domain/range pattern in the query text
/// becomes an add-property patch; else a subclass pattern becomes an
/// add-subclass patch; else the first two recognized vocabulary tokens are
/// paired as a subclass patch. Queries yielding no tier are skipped.
#[must_use]
pub fn from_competency(outcomes: &[CompetencyOutcome], registry: &TermRegistry) -> Vec<Patch> {
    let mut patches = Vec::new();
    for outcome in outcomes.iter().filter(|o| !o.success) {
        if let Some(caps) = expects_re().captures(&outcome.query) {
            patches.push(Patch {
                action: PatchAction::AddProperty,
                subject: caps[1].to_string(),
                predicate: caps[2].to_string(),
                object: caps[3].to_string(),
                message: None,
                source: Some("competency:expects".to_string()),
                severity: None,
            });
            continue;
        }
        if let Some(caps) = domain_range_re().captures(&outcome.query) {
            patches.push(Patch {
                action: PatchAction::AddProperty,
                subject: caps[1].to_string(),
                predicate: format!("rdfs:{}", &caps[2]),
                object: caps[3].to_string(),
                message: None,
                source: Some("competency:domain_range".to_string()),
                severity: None,
            });
            continue;
        }
        if let Some(caps) = subclass_re().captures(&outcome.query) {
            patches.push(Patch {
                action: PatchAction::AddSubclass,
                subject: caps[1].to_string(),
                predicate: "rdfs:subClassOf".to_string(),
                object: caps[2].to_string(),
                message: None,
                source: Some("competency:subclass".to_string()),
                severity: None,
            });
            continue;
        }
        let vocabulary: BTreeSet<&str> = registry.vocabulary().collect();
        let mut found: Vec<&str> = Vec::new();
        for token in outcome.query.split_whitespace() {
            let token = token.trim_end_matches('.');
            if vocabulary.contains(token) && !found.contains(&token) {
                found.push(token);
                if found.len() == 2 {
                    break;
                }
            }
        }
        if let [first, second] = found[..] {
            patches.push(Patch {
                action: PatchAction::AddSubclass,
                subject: first.to_string(),
                predicate: "rdfs:subClassOf".to_string(),
                object: second.to_string(),
                message: None,
                source: Some("competency:vocabulary_pair".to_string()),
                severity: None,
            });
        }
    }
    patches
}

/// Merge both producers, dedupe by identity key, and sort.
#[must_use]
pub fn synthesize(
    violations: &[CanonicalViolation],
    outcomes: &[CompetencyOutcome],
    registry: &TermRegistry,
    promote_soft: bool,
) -> Vec<Patch> {
    let mut patches = from_violations(violations, registry, promote_soft);
    patches.extend(from_competency(outcomes, registry));

    let mut seen: BTreeSet<(String, String, String)> = BTreeSet::new();
    patches.retain(|p| {
        seen.insert((
            p.subject.clone(),
            p.predicate.clone(),
            p.object.clone(),
        ))
    });
    patches.sort_by(|a, b| a.key().cmp(&b.key()));
    patches
}
