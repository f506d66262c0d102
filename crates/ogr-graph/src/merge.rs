//! Merging parsed triples into the draft graph.
//!
//! Three selectable behaviors: unconstrained, strict-terms (unregistered
//! vocabulary is discarded, loudly), and synonym canonicalization. Merging
//! also enforces the exclusive-type rule: when an entity is asserted into a
//! class declared disjoint with one it already has, the last assertion wins
//! and the prior conflicting type triples are retracted.

use serde::{Deserialize, Serialize};

use crate::registry::TermRegistry;
use crate::triple::{DraftGraph, Term, Triple, RDF_TYPE};

/// How incoming triples are admitted into the draft graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Admit everything
    #[default]
    Unconstrained,
    /// Discard triples using unregistered properties or classes
    StrictTerms,
    /// Rewrite subjects/objects through the synonym map before insertion
    CanonicalizeSynonyms,
}

/// What one merge call did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Triples newly added
    pub added: usize,
    /// Incoming triples rejected by the strict-terms policy
    pub discarded: Vec<Triple>,
    /// Existing triples retracted by the exclusive-type rule
    pub retracted: Vec<Triple>,
}

/// Applies a merge policy and the disjoint-class table.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    policy: MergePolicy,
    disjoint: Vec<(String, String)>,
}

impl Merger {
    /// Merger with the given policy and no disjointness table.
    #[inline]
    #[must_use]
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            disjoint: Vec::new(),
        }
    }

    /// Declare a pair of mutually exclusive classes.
    #[must_use]
    pub fn with_disjoint(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.disjoint.push((left.into(), right.into()));
        self
    }

    /// Whether two classes are declared mutually exclusive.
    #[must_use]
    pub fn are_disjoint(&self, left: &str, right: &str) -> bool {
        self.disjoint
            .iter()
            .any(|(a, b)| (a == left && b == right) || (a == right && b == left))
    }

    /// Merge `incoming` into `graph` under the configured policy.
    ///
    /// The registry must reflect the graph as of before this call; the
    /// caller recomputes it afterwards.
    pub fn merge(
        &self,
        graph: &mut DraftGraph,
        registry: &TermRegistry,
        incoming: Vec<Triple>,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for triple in incoming {
            let triple = match self.policy {
                MergePolicy::Unconstrained => triple,
                MergePolicy::StrictTerms => {
                    if let Some(rejected) = self.strict_reject(registry, &triple) {
                        tracing::warn!(triple = %rejected, "strict-terms merge discarded triple");
                        outcome.discarded.push(rejected);
                        continue;
                    }
                    triple
                }
                MergePolicy::CanonicalizeSynonyms => canonicalize(registry, triple),
            };

            if triple.predicate == RDF_TYPE {
                self.retract_conflicting_types(graph, &triple, &mut outcome);
            }
            if graph.insert(triple) {
                outcome.added += 1;
            }
        }
        outcome
    }

    /// Returns the triple back if strict-terms rejects it.
    fn strict_reject(&self, registry: &TermRegistry, triple: &Triple) -> Option<Triple> {
        match triple.predicate.as_str() {
            RDF_TYPE | "rdfs:subClassOf" => {
                let Some(object) = triple.object.name() else {
                    return Some(triple.clone());
                };
                let known = registry.is_class(object)
                    || registry.is_synonym(object)
                    || object.starts_with("owl:")
                    || object.starts_with("rdfs:");
                if known {
                    None
                } else {
                    Some(triple.clone())
                }
            }
            predicate => {
                if registry.is_property(predicate) || predicate.starts_with("rdfs:") {
                    None
                } else {
                    Some(triple.clone())
                }
            }
        }
    }

    /// Last assertion wins: retract existing `rdf:type` triples whose class
    /// is disjoint with the incoming one.
    fn retract_conflicting_types(
        &self,
        graph: &mut DraftGraph,
        incoming: &Triple,
        outcome: &mut MergeOutcome,
    ) {
        let Some(new_class) = incoming.object.name() else {
            return;
        };
        let conflicting: Vec<Triple> = graph
            .objects(&incoming.subject, RDF_TYPE)
            .filter_map(Term::name)
            .filter(|existing| self.are_disjoint(existing, new_class))
            .map(|existing| {
                Triple::new(
                    incoming.subject.clone(),
                    RDF_TYPE,
                    Term::named(existing),
                )
            })
            .collect();
        for triple in conflicting {
            tracing::warn!(
                entity = %triple.subject,
                retracted = ?triple.object,
                asserted = new_class,
                "exclusive-type conflict, last assertion wins"
            );
            graph.remove(&triple);
            outcome.retracted.push(triple);
        }
    }
}

fn canonicalize(registry: &TermRegistry, triple: Triple) -> Triple {
    let subject = registry.canonical(&triple.subject).to_string();
    let object = match &triple.object {
        Term::Named(name) => Term::named(registry.canonical(name)),
        literal => literal.clone(),
    };
    Triple::new(subject, triple.predicate, object)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_graph() -> DraftGraph {
        let mut graph = DraftGraph::new();
        graph.insert(Triple::new("atm:CashCard", RDF_TYPE, Term::named("owl:Class")));
        graph.insert(Triple::new("atm:Person", RDF_TYPE, Term::named("owl:Class")));
        graph.insert(Triple::new(
            "atm:hasOwner",
            RDF_TYPE,
            Term::named("owl:ObjectProperty"),
        ));
        graph.insert(Triple::new(
            "atm:Person",
            "skos:altLabel",
            Term::literal("Customer"),
        ));
        graph
    }

    #[test]
    fn unconstrained_admits_everything() {
        let mut graph = schema_graph();
        let registry = TermRegistry::from_graph(&graph);
        let outcome = Merger::new(MergePolicy::Unconstrained).merge(
            &mut graph,
            &registry,
            vec![Triple::new("atm:X", "atm:unheardOf", Term::named("atm:Y"))],
        );
        assert_eq!(outcome.added, 1);
        assert!(outcome.discarded.is_empty());
    }

    #[test]
    fn strict_terms_discards_unknown_predicate() {
        let mut graph = schema_graph();
        let registry = TermRegistry::from_graph(&graph);
        let outcome = Merger::new(MergePolicy::StrictTerms).merge(
            &mut graph,
            &registry,
            vec![
                Triple::new("atm:Card1", "atm:unheardOf", Term::named("atm:Person")),
                Triple::new("atm:Card1", RDF_TYPE, Term::named("atm:CashCard")),
            ],
        );
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.discarded.len(), 1);
        assert_eq!(outcome.discarded[0].predicate, "atm:unheardOf");
    }

    #[test]
    fn strict_terms_discards_unknown_class_assertion() {
        let mut graph = schema_graph();
        let registry = TermRegistry::from_graph(&graph);
        let outcome = Merger::new(MergePolicy::StrictTerms).merge(
            &mut graph,
            &registry,
            vec![Triple::new("atm:X", RDF_TYPE, Term::named("atm:Imaginary"))],
        );
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.discarded.len(), 1);
    }

    #[test]
    fn synonyms_rewrite_to_canonical() {
        let mut graph = schema_graph();
        let registry = TermRegistry::from_graph(&graph);
        Merger::new(MergePolicy::CanonicalizeSynonyms).merge(
            &mut graph,
            &registry,
            vec![Triple::new(
                "atm:Card1",
                "atm:hasOwner",
                Term::named("Customer"),
            )],
        );
        assert!(graph.contains(&Triple::new(
            "atm:Card1",
            "atm:hasOwner",
            Term::named("atm:Person"),
        )));
    }

    #[test]
    fn exclusive_types_last_assertion_wins() {
        let mut graph = schema_graph();
        graph.insert(Triple::new("atm:T1", RDF_TYPE, Term::named("atm:Deposit")));
        let registry = TermRegistry::from_graph(&graph);
        let merger =
            Merger::new(MergePolicy::Unconstrained).with_disjoint("atm:Deposit", "atm:Withdrawal");
        let outcome = merger.merge(
            &mut graph,
            &registry,
            vec![Triple::new("atm:T1", RDF_TYPE, Term::named("atm:Withdrawal"))],
        );
        assert_eq!(outcome.retracted.len(), 1);
        assert!(!graph.contains(&Triple::new("atm:T1", RDF_TYPE, Term::named("atm:Deposit"))));
        assert!(graph.contains(&Triple::new("atm:T1", RDF_TYPE, Term::named("atm:Withdrawal"))));
    }
}
