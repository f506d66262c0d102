//! Consistency checking.
//!
//! The adapter owns the contract the loop relies on: it always returns a
//! report plus an expanded graph, whatever the underlying reasoner does.
//! Generator output frequently annotates free-text tokens with typed
//! literals it cannot validate, so the adapter coerces invalid numeric and
//! temporal literals to plain strings and strips structurally broken
//! restriction axioms before the reasoner ever sees the graph. A reasoner
//! fault degrades to a partial report with the fault in `notes`; it never
//! propagates to the loop.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ogr_graph::{DraftGraph, Literal, Term, Triple, RDF_TYPE};

use crate::datatype::valid_lexical;

const CHECKED_DATATYPES: &[&str] = &["xsd:decimal", "xsd:integer", "xsd:dateTime"];

/// Summary of one consistency check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonerReport {
    /// Whether a reasoner actually ran
    pub enabled: bool,
    /// Consistency verdict; `None` when no verdict could be reached
    pub consistent: Option<bool>,
    /// Entities found unsatisfiable
    pub unsatisfiable: Vec<String>,
    /// Sanitization and degradation notes
    pub notes: String,
}

/// Report plus the entailment-expanded graph.
#[derive(Debug, Clone)]
pub struct ReasonerOutcome {
    /// Diagnostics for the audit trail
    pub report: ReasonerReport,
    /// Expanded graph; a defensive copy of the input when no reasoner ran
    pub expanded: DraftGraph,
}

/// A reasoner backend. May fault; the adapter absorbs faults.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Materialize entailments and judge consistency.
    async fn infer(&self, graph: &DraftGraph) -> Result<ReasonerOutcome, ReasonerFault>;
}

/// Opaque reasoner failure, converted to a degraded report by the adapter.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ReasonerFault(pub String);

/// Adapter between the loop and an optional reasoner backend.
pub struct ReasonerAdapter<R> {
    inner: Option<R>,
}

impl<R: Reasoner> ReasonerAdapter<R> {
    /// Adapter over a live reasoner.
    #[inline]
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self { inner: Some(inner) }
    }

    /// Adapter with reasoning disabled; `check` returns defensive copies.
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Run the consistency check. Never fails.
    pub async fn check(&self, graph: &DraftGraph) -> ReasonerOutcome {
        let (sanitized, mut notes) = sanitize_for_reasoning(graph);

        let Some(reasoner) = &self.inner else {
            notes.push("Reasoner disabled; expanded graph is a defensive copy.".to_string());
            return ReasonerOutcome {
                report: ReasonerReport {
                    enabled: false,
                    consistent: None,
                    unsatisfiable: Vec::new(),
                    notes: notes.join(" "),
                },
                expanded: sanitized,
            };
        };

        match reasoner.infer(&sanitized).await {
            Ok(mut outcome) => {
                if !notes.is_empty() {
                    let mut merged = notes;
                    if !outcome.report.notes.is_empty() {
                        merged.push(outcome.report.notes.clone());
                    }
                    outcome.report.notes = merged.join(" ");
                }
                outcome
            }
            Err(fault) => {
                tracing::warn!(error = %fault, "reasoner fault, degrading to partial report");
                notes.push(format!("Reasoner fault: {fault}."));
                ReasonerOutcome {
                    report: ReasonerReport {
                        enabled: true,
                        consistent: None,
                        unsatisfiable: Vec::new(),
                        notes: notes.join(" "),
                    },
                    expanded: sanitized,
                }
            }
        }
    }
}

/// Coerce invalid typed literals to plain strings and drop restriction
/// nodes that lack `owl:onProperty`. Returns the cleaned graph and notes.
fn sanitize_for_reasoning(graph: &DraftGraph) -> (DraftGraph, Vec<String>) {
    let mut notes = Vec::new();

    let mut coerced = 0usize;
    let mut triples: Vec<Triple> = Vec::with_capacity(graph.len());
    for triple in graph.iter() {
        let replacement = match &triple.object {
            Term::Literal(literal) => match &literal.datatype {
                Some(dt)
                    if CHECKED_DATATYPES.contains(&dt.as_str())
                        && !valid_lexical(dt, &literal.lexical) =>
                {
                    coerced += 1;
                    Some(Term::Literal(Literal {
                        lexical: literal.lexical.clone(),
                        datatype: None,
                        language: None,
                    }))
                }
                _ => None,
            },
            Term::Named(_) => None,
        };
        triples.push(match replacement {
            Some(object) => Triple::new(triple.subject.clone(), triple.predicate.clone(), object),
            None => triple.clone(),
        });
    }
    if coerced > 0 {
        notes.push(format!(
            "Coerced {coerced} invalid typed literals to plain strings before reasoning."
        ));
    }

    let broken: BTreeSet<&str> = triples
        .iter()
        .filter(|t| {
            t.predicate == RDF_TYPE && t.object.name() == Some("owl:Restriction")
        })
        .map(|t| t.subject.as_str())
        .filter(|s| {
            !triples
                .iter()
                .any(|t| t.subject == *s && t.predicate == "owl:onProperty")
        })
        .collect();
    if !broken.is_empty() {
        notes.push(format!(
            "Stripped {} restriction nodes missing owl:onProperty.",
            broken.len()
        ));
    }
    let broken: BTreeSet<String> = broken.into_iter().map(str::to_string).collect();
    triples.retain(|t| {
        !broken.contains(&t.subject)
            && t.object.name().map_or(true, |name| !broken.contains(name))
    });

    let mut sanitized = graph.clone();
    sanitized.replace_triples(triples);
    (sanitized, notes)
}

/// Built-in reasoner over RDFS entailment rules plus class disjointness.
#[derive(Debug, Clone, Default)]
pub struct RdfsReasoner {
    disjoint: Vec<(String, String)>,
}

impl RdfsReasoner {
    /// Reasoner with no disjointness axioms.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare class pairs whose joint membership is unsatisfiable.
    #[must_use]
    pub fn with_disjoint(mut self, pairs: Vec<(String, String)>) -> Self {
        self.disjoint = pairs;
        self
    }
}

#[async_trait]
impl Reasoner for RdfsReasoner {
    async fn infer(&self, graph: &DraftGraph) -> Result<ReasonerOutcome, ReasonerFault> {
        let mut expanded = graph.clone();

        // transitive closure over rdfs:subClassOf
        let mut supers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for triple in graph.iter() {
            if triple.predicate == "rdfs:subClassOf" {
                if let Some(object) = triple.object.name() {
                    supers
                        .entry(triple.subject.clone())
                        .or_default()
                        .insert(object.to_string());
                }
            }
        }
        loop {
            let mut grew = false;
            let snapshot = supers.clone();
            for (class, direct) in &snapshot {
                for parent in direct {
                    if let Some(grandparents) = snapshot.get(parent) {
                        let entry = supers.entry(class.clone()).or_default();
                        for gp in grandparents {
                            grew |= entry.insert(gp.clone());
                        }
                    }
                }
            }
            if !grew {
                break;
            }
        }
        for (class, ancestors) in &supers {
            for ancestor in ancestors {
                expanded.insert(Triple::new(
                    class.clone(),
                    "rdfs:subClassOf",
                    Term::named(ancestor.clone()),
                ));
            }
        }

        // domain/range typing
        let mut domains: BTreeMap<String, String> = BTreeMap::new();
        let mut ranges: BTreeMap<String, String> = BTreeMap::new();
        for triple in graph.iter() {
            if let Some(object) = triple.object.name() {
                if triple.predicate == "rdfs:domain" {
                    domains.insert(triple.subject.clone(), object.to_string());
                } else if triple.predicate == "rdfs:range" && !object.starts_with("xsd:") {
                    ranges.insert(triple.subject.clone(), object.to_string());
                }
            }
        }
        let assertions: Vec<Triple> = graph.iter().cloned().collect();
        for triple in &assertions {
            if let Some(class) = domains.get(&triple.predicate) {
                expanded.insert(Triple::new(
                    triple.subject.clone(),
                    RDF_TYPE,
                    Term::named(class.clone()),
                ));
            }
            if let Some(class) = ranges.get(&triple.predicate) {
                if let Some(object) = triple.object.name() {
                    expanded.insert(Triple::new(object.to_string(), RDF_TYPE, Term::named(class.clone())));
                }
            }
        }

        // type inheritance up the closure
        let typed: Vec<(String, String)> = expanded
            .iter()
            .filter(|t| t.predicate == RDF_TYPE)
            .filter_map(|t| t.object.name().map(|c| (t.subject.clone(), c.to_string())))
            .collect();
        for (entity, class) in &typed {
            if let Some(ancestors) = supers.get(class) {
                for ancestor in ancestors {
                    expanded.insert(Triple::new(
                        entity.clone(),
                        RDF_TYPE,
                        Term::named(ancestor.clone()),
                    ));
                }
            }
        }

        // disjointness over the expanded types
        let mut unsatisfiable: BTreeSet<String> = BTreeSet::new();
        for (first, second) in &self.disjoint {
            for entity in expanded.subjects_with(RDF_TYPE, first) {
                if expanded
                    .subjects_with(RDF_TYPE, second)
                    .any(|other| other == entity)
                {
                    unsatisfiable.insert(entity.to_string());
                }
            }
        }

        let consistent = unsatisfiable.is_empty();
        Ok(ReasonerOutcome {
            report: ReasonerReport {
                enabled: true,
                consistent: Some(consistent),
                unsatisfiable: unsatisfiable.into_iter().collect(),
                notes: String::new(),
            },
            expanded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_graph() -> DraftGraph {
        DraftGraph::with_base("atm", "http://example.com/atm#")
    }

    #[tokio::test]
    async fn disabled_adapter_returns_defensive_copy() {
        let mut graph = base_graph();
        graph.insert(Triple::new("atm:Card1", RDF_TYPE, Term::named("atm:CashCard")));
        let adapter: ReasonerAdapter<RdfsReasoner> = ReasonerAdapter::disabled();
        let outcome = adapter.check(&graph).await;
        assert!(!outcome.report.enabled);
        assert!(outcome.report.consistent.is_none());
        assert_eq!(outcome.expanded.len(), graph.len());
    }

    #[tokio::test]
    async fn invalid_decimal_is_coerced_before_reasoning() {
        let mut graph = base_graph();
        graph.insert(Triple::new(
            "atm:Response",
            "atm:rejects",
            Term::typed("amount", "xsd:decimal"),
        ));
        let adapter = ReasonerAdapter::new(RdfsReasoner::new());
        let outcome = adapter.check(&graph).await;
        assert!(outcome.report.notes.contains("Coerced 1"));
        let literal = outcome
            .expanded
            .iter()
            .find_map(|t| t.object.as_literal())
            .unwrap();
        assert!(literal.datatype.is_none());
        assert_eq!(literal.lexical, "amount");
    }

    #[tokio::test]
    async fn valid_decimal_is_untouched() {
        let mut graph = base_graph();
        graph.insert(Triple::new(
            "atm:Response",
            "atm:rejects",
            Term::typed("100.00", "xsd:decimal"),
        ));
        let adapter = ReasonerAdapter::new(RdfsReasoner::new());
        let outcome = adapter.check(&graph).await;
        assert!(!outcome.report.notes.contains("Coerced"));
    }

    #[tokio::test]
    async fn broken_restriction_is_stripped() {
        let mut graph = base_graph();
        graph.insert(Triple::new("_:b0", RDF_TYPE, Term::named("owl:Restriction")));
        graph.insert(Triple::new(
            "_:b0",
            "owl:minCardinality",
            Term::typed("1", "xsd:integer"),
        ));
        graph.insert(Triple::new(
            "atm:CashCard",
            "rdfs:subClassOf",
            Term::named("_:b0"),
        ));
        graph.insert(Triple::new("atm:Card1", RDF_TYPE, Term::named("atm:CashCard")));
        let adapter = ReasonerAdapter::new(RdfsReasoner::new());
        let outcome = adapter.check(&graph).await;
        assert!(outcome.report.notes.contains("Stripped 1 restriction"));
        assert!(!outcome.expanded.knows_entity("_:b0"));
    }

    #[tokio::test]
    async fn subclass_transitivity_and_type_inheritance() {
        let mut graph = base_graph();
        graph.insert(Triple::new(
            "atm:CashCard",
            "rdfs:subClassOf",
            Term::named("atm:Card"),
        ));
        graph.insert(Triple::new(
            "atm:Card",
            "rdfs:subClassOf",
            Term::named("atm:Asset"),
        ));
        graph.insert(Triple::new("atm:Card1", RDF_TYPE, Term::named("atm:CashCard")));
        let outcome = RdfsReasoner::new().infer(&graph).await.unwrap();
        assert!(outcome.expanded.contains(&Triple::new(
            "atm:CashCard",
            "rdfs:subClassOf",
            Term::named("atm:Asset"),
        )));
        assert!(outcome.expanded.contains(&Triple::new(
            "atm:Card1",
            RDF_TYPE,
            Term::named("atm:Asset"),
        )));
        assert_eq!(outcome.report.consistent, Some(true));
    }

    #[tokio::test]
    async fn domain_and_range_add_types() {
        let mut graph = base_graph();
        graph.insert(Triple::new(
            "atm:hasOwner",
            "rdfs:domain",
            Term::named("atm:CashCard"),
        ));
        graph.insert(Triple::new(
            "atm:hasOwner",
            "rdfs:range",
            Term::named("atm:Person"),
        ));
        graph.insert(Triple::new(
            "atm:Card1",
            "atm:hasOwner",
            Term::named("atm:P1"),
        ));
        let outcome = RdfsReasoner::new().infer(&graph).await.unwrap();
        assert!(outcome.expanded.contains(&Triple::new(
            "atm:Card1",
            RDF_TYPE,
            Term::named("atm:CashCard"),
        )));
        assert!(outcome.expanded.contains(&Triple::new(
            "atm:P1",
            RDF_TYPE,
            Term::named("atm:Person"),
        )));
    }

    #[tokio::test]
    async fn disjoint_membership_is_unsatisfiable() {
        let mut graph = base_graph();
        graph.insert(Triple::new("atm:X", RDF_TYPE, Term::named("atm:CashCard")));
        graph.insert(Triple::new("atm:X", RDF_TYPE, Term::named("atm:Person")));
        let reasoner = RdfsReasoner::new().with_disjoint(vec![(
            "atm:CashCard".to_string(),
            "atm:Person".to_string(),
        )]);
        let outcome = reasoner.infer(&graph).await.unwrap();
        assert_eq!(outcome.report.consistent, Some(false));
        assert_eq!(outcome.report.unsatisfiable, vec!["atm:X".to_string()]);
    }
}
