//! Bounded traversal around a violation's focus entity.
//!
//! Produces a self-contained Turtle snippet describing the local
//! neighborhood. Traversal is breadth-first with a visited set (cycles
//! terminate) and a hard triple budget: downstream generator calls are cost-
//! and latency-sensitive, so the extractor favors boundedness over
//! exhaustiveness and truncates in first-seen order.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::triple::{DraftGraph, Triple};
use crate::turtle;

/// Which relations a hop may follow, dispatched on the variant tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathSpec {
    /// Follow all outgoing and incoming edges
    Any,
    /// Follow only the named relation, both directions
    Direct { predicate: String },
    /// Follow the named relation from object back to subject only
    Inverse { predicate: String },
    /// Follow any relation of the named set
    Alternative { predicates: Vec<String> },
    /// Apply one single-step spec per hop; traversal stops early if the
    /// list runs out before the hop limit
    Sequence { steps: Vec<PathSpec> },
}

impl PathSpec {
    /// Direct single-predicate path.
    #[inline]
    pub fn direct(predicate: impl Into<String>) -> Self {
        Self::Direct {
            predicate: predicate.into(),
        }
    }

    /// The step to apply at `hop`, or `None` when a sequence is exhausted.
    fn step_at(&self, hop: usize) -> Option<&PathSpec> {
        match self {
            Self::Sequence { steps } => steps.get(hop),
            other => Some(other),
        }
    }

    fn follows(&self, predicate: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Direct { predicate: p } | Self::Inverse { predicate: p } => p == predicate,
            Self::Alternative { predicates } => predicates.iter().any(|p| p == predicate),
            // nested sequences are not single-step; treated as unconstrained
            Self::Sequence { .. } => true,
        }
    }

    fn outgoing_allowed(&self) -> bool {
        !matches!(self, Self::Inverse { .. })
    }
}

/// A bounded sub-graph around a focus entity.
#[derive(Debug, Clone, Default)]
pub struct ContextSnippet {
    /// Triples in first-seen order, at most the configured budget
    pub triples: Vec<Triple>,
    /// Whether the budget cut the neighborhood short
    pub truncated: bool,
}

impl ContextSnippet {
    /// Render as a self-contained Turtle snippet using the graph's
    /// prefix declarations.
    #[must_use]
    pub fn to_turtle(&self, graph: &DraftGraph) -> String {
        turtle::serialize(graph.prefixes(), self.triples.iter())
    }

    /// Whether nothing relevant was found.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

/// Extracts bounded neighborhoods from the draft graph.
#[derive(Debug, Clone, Copy)]
pub struct ContextExtractor {
    hop_limit: usize,
    triple_budget: usize,
}

impl ContextExtractor {
    /// Extractor with the given hop limit and triple budget.
    #[inline]
    #[must_use]
    pub fn new(hop_limit: usize, triple_budget: usize) -> Self {
        Self {
            hop_limit,
            triple_budget,
        }
    }

    /// Neighborhood of `focus` under `path`. An unknown focus entity
    /// yields an empty snippet; that is not an error.
    #[must_use]
    pub fn extract(&self, graph: &DraftGraph, focus: &str, path: Option<&PathSpec>) -> ContextSnippet {
        let spec = path.unwrap_or(&PathSpec::Any);
        let mut visited: IndexSet<String> = IndexSet::new();
        let mut collected: IndexSet<Triple> = IndexSet::new();
        let mut frontier: Vec<String> = vec![focus.to_string()];
        visited.insert(focus.to_string());
        let mut truncated = false;

        'hops: for hop in 0..self.hop_limit {
            let Some(step) = spec.step_at(hop) else {
                // sequence exhausted before the hop limit
                break;
            };
            let mut next: Vec<String> = Vec::new();
            for entity in &frontier {
                if step.outgoing_allowed() {
                    for triple in graph.outgoing(entity) {
                        if !step.follows(&triple.predicate) {
                            continue;
                        }
                        if collected.len() >= self.triple_budget {
                            truncated = true;
                            break 'hops;
                        }
                        collected.insert(triple.clone());
                        if let Some(name) = triple.object.name() {
                            if visited.insert(name.to_string()) {
                                next.push(name.to_string());
                            }
                        }
                    }
                }
                for triple in graph.incoming(entity) {
                    if !step.follows(&triple.predicate) {
                        continue;
                    }
                    if collected.len() >= self.triple_budget {
                        truncated = true;
                        break 'hops;
                    }
                    collected.insert(triple.clone());
                    if visited.insert(triple.subject.clone()) {
                        next.push(triple.subject.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        if truncated {
            tracing::debug!(
                focus,
                budget = self.triple_budget,
                "context snippet truncated to budget"
            );
        }
        ContextSnippet {
            triples: collected.into_iter().collect(),
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::{Term, RDF_TYPE};
    use proptest::prelude::*;

    fn chain_graph() -> DraftGraph {
        let mut graph = DraftGraph::with_base("atm", "http://example.com/atm#");
        graph.insert(Triple::new("atm:Card1", RDF_TYPE, Term::named("atm:CashCard")));
        graph.insert(Triple::new("atm:Card1", "atm:hasOwner", Term::named("atm:P1")));
        graph.insert(Triple::new("atm:P1", "atm:holds", Term::named("atm:Acct1")));
        graph.insert(Triple::new("atm:Acct1", "atm:at", Term::named("atm:Bank1")));
        graph.insert(Triple::new("atm:Bank1", "atm:issued", Term::named("atm:Card1")));
        graph
    }

    #[test]
    fn unknown_focus_yields_empty_snippet() {
        let graph = chain_graph();
        let snippet = ContextExtractor::new(2, 10).extract(&graph, "atm:Ghost", None);
        assert!(snippet.is_empty());
        assert!(!snippet.truncated);
    }

    #[test]
    fn hop_limit_bounds_depth() {
        let graph = chain_graph();
        let snippet = ContextExtractor::new(1, 100).extract(&graph, "atm:Card1", None);
        // one hop: Card1's own edges only (outgoing + incoming)
        assert_eq!(snippet.triples.len(), 3);
    }

    #[test]
    fn budget_truncates_first_seen() {
        let graph = chain_graph();
        let snippet = ContextExtractor::new(4, 2).extract(&graph, "atm:Card1", None);
        assert_eq!(snippet.triples.len(), 2);
        assert!(snippet.truncated);
    }

    #[test]
    fn cycles_terminate() {
        let graph = chain_graph(); // Bank1 -> Card1 closes a cycle
        let snippet = ContextExtractor::new(50, 100).extract(&graph, "atm:Card1", None);
        assert_eq!(snippet.triples.len(), graph.len());
    }

    #[test]
    fn direct_path_follows_named_relation_only() {
        let graph = chain_graph();
        let spec = PathSpec::direct("atm:hasOwner");
        let snippet = ContextExtractor::new(3, 100).extract(&graph, "atm:Card1", Some(&spec));
        assert_eq!(snippet.triples.len(), 1);
        assert_eq!(snippet.triples[0].predicate, "atm:hasOwner");
    }

    #[test]
    fn inverse_path_walks_object_to_subject() {
        let graph = chain_graph();
        let spec = PathSpec::Inverse {
            predicate: "atm:issued".to_string(),
        };
        let snippet = ContextExtractor::new(2, 100).extract(&graph, "atm:Card1", Some(&spec));
        assert_eq!(snippet.triples.len(), 1);
        assert_eq!(snippet.triples[0].subject, "atm:Bank1");
    }

    #[test]
    fn sequence_stops_when_exhausted() {
        let graph = chain_graph();
        let spec = PathSpec::Sequence {
            steps: vec![PathSpec::direct("atm:hasOwner")],
        };
        let snippet = ContextExtractor::new(5, 100).extract(&graph, "atm:Card1", Some(&spec));
        assert_eq!(snippet.triples.len(), 1);
    }

    #[test]
    fn snippet_renders_with_prefix_header() {
        let graph = chain_graph();
        let snippet = ContextExtractor::new(1, 10).extract(&graph, "atm:Card1", None);
        let rendered = snippet.to_turtle(&graph);
        assert!(rendered.contains("@prefix atm:"));
        crate::turtle::parse(&rendered).unwrap();
    }

    proptest! {
        #[test]
        fn traversal_respects_budget(hops in 0usize..8, budget in 0usize..12) {
            let graph = chain_graph();
            let snippet = ContextExtractor::new(hops, budget).extract(&graph, "atm:Card1", None);
            prop_assert!(snippet.triples.len() <= budget);
        }
    }
}
