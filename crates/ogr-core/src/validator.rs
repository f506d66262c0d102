//! Constraint validation.
//!
//! The loop only sees the [`ConstraintValidator`] trait: a validator takes
//! the (reasoner-expanded) graph and reports conformance plus structured
//! violations. Validators never raise; a validator that cannot run returns
//! a degraded outcome with the reason in `notes`, and the loop carries on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ogr_graph::{DraftGraph, Term, RDF_TYPE};

use crate::datatype::valid_lexical;
use crate::violation::{Severity, Violation};

/// Violation counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// All violations
    pub total: usize,
    /// Conformance-blocking violations
    pub hard: usize,
    /// Advisory violations
    pub soft: usize,
}

/// Result of one validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the graph satisfies every hard constraint
    pub conforms: bool,
    /// Structured violations, fresh each pass
    pub violations: Vec<Violation>,
    /// Severity counts
    pub summary: ValidationSummary,
    /// Degradation notes; empty when the validator ran cleanly
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl ValidationOutcome {
    /// Outcome from a violation list, computing the summary.
    #[must_use]
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        let hard = violations
            .iter()
            .filter(|v| v.severity == Severity::Hard)
            .count();
        let summary = ValidationSummary {
            total: violations.len(),
            hard,
            soft: violations.len() - hard,
        };
        Self {
            conforms: hard == 0,
            violations,
            summary,
            notes: String::new(),
        }
    }

    /// Degraded outcome when the validator could not run.
    #[must_use]
    pub fn degraded(notes: impl Into<String>) -> Self {
        Self {
            conforms: false,
            violations: Vec::new(),
            summary: ValidationSummary::default(),
            notes: notes.into(),
        }
    }
}

/// A validator checking the draft graph against a declarative ruleset.
#[async_trait]
pub trait ConstraintValidator: Send + Sync {
    /// Validate the graph. Never fails; degraded runs return an outcome
    /// with `notes` set.
    async fn validate(&self, graph: &DraftGraph) -> ValidationOutcome;
}

/// One declarative constraint of the built-in ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Every instance of `target_class` must carry `property`
    RequiredProperty {
        /// Class whose instances are checked
        target_class: String,
        /// Property each instance must carry
        property: String,
        /// Severity of a missing property
        #[serde(default = "default_hard")]
        severity: Severity,
    },
    /// Literal objects of `property` must be valid values of `datatype`
    LiteralDatatype {
        /// Property whose literal objects are checked
        property: String,
        /// Required datatype qname
        datatype: String,
        /// Severity of a mistyped or invalid literal
        #[serde(default = "default_hard")]
        severity: Severity,
    },
    /// No entity may be typed into both classes
    DisjointClasses {
        /// First class
        first: String,
        /// Second class
        second: String,
    },
}

fn default_hard() -> Severity {
    Severity::Hard
}

/// Built-in validator over a JSON-loadable ruleset.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    rules: Vec<Rule>,
}

impl RuleValidator {
    /// Validator over the given rules.
    #[inline]
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parse a ruleset from its JSON serialization.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(input)?))
    }

    /// Class pairs declared disjoint by the ruleset.
    #[must_use]
    pub fn disjoint_pairs(&self) -> Vec<(String, String)> {
        self.rules
            .iter()
            .filter_map(|rule| match rule {
                Rule::DisjointClasses { first, second } => {
                    Some((first.clone(), second.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn check_rule(&self, rule: &Rule, graph: &DraftGraph, out: &mut Vec<Violation>) {
        match rule {
            Rule::RequiredProperty {
                target_class,
                property,
                severity,
            } => {
                for subject in graph.subjects_with(RDF_TYPE, target_class) {
                    if graph.objects(subject, property).next().is_none() {
                        out.push(Violation {
                            focus: Some(subject.to_string()),
                            path: Some(property.clone()),
                            message: format!(
                                "{subject} is a {target_class} but has no {property}"
                            ),
                            constraint: "RequiredProperty".to_string(),
                            severity: *severity,
                            expected: Some("1".to_string()),
                            observed: Some("0".to_string()),
                        });
                    }
                }
            }
            Rule::LiteralDatatype {
                property,
                datatype,
                severity,
            } => {
                for triple in graph.iter() {
                    if triple.predicate != *property {
                        continue;
                    }
                    let Term::Literal(literal) = &triple.object else {
                        continue;
                    };
                    let declared = literal.datatype.as_deref();
                    let conformant = declared == Some(datatype.as_str())
                        && valid_lexical(datatype, &literal.lexical);
                    if !conformant {
                        out.push(Violation {
                            focus: Some(triple.subject.clone()),
                            path: Some(property.clone()),
                            message: format!(
                                "literal \"{}\" is not a valid {datatype}",
                                literal.lexical
                            ),
                            constraint: "LiteralDatatype".to_string(),
                            severity: *severity,
                            expected: Some(datatype.clone()),
                            observed: Some(literal.lexical.clone()),
                        });
                    }
                }
            }
            Rule::DisjointClasses { first, second } => {
                let in_first: Vec<&str> = graph.subjects_with(RDF_TYPE, first).collect();
                for subject in in_first {
                    if graph
                        .subjects_with(RDF_TYPE, second)
                        .any(|other| other == subject)
                    {
                        out.push(Violation {
                            focus: Some(subject.to_string()),
                            path: Some(RDF_TYPE.to_string()),
                            message: format!(
                                "{subject} is typed into disjoint classes {first} and {second}"
                            ),
                            constraint: "DisjointClasses".to_string(),
                            severity: Severity::Hard,
                            expected: Some(first.clone()),
                            observed: Some(second.clone()),
                        });
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ConstraintValidator for RuleValidator {
    async fn validate(&self, graph: &DraftGraph) -> ValidationOutcome {
        let mut violations = Vec::new();
        for rule in &self.rules {
            self.check_rule(rule, graph, &mut violations);
        }
        tracing::debug!(
            total = violations.len(),
            rules = self.rules.len(),
            "rule validation complete"
        );
        ValidationOutcome::from_violations(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogr_graph::Triple;

    fn card_graph() -> DraftGraph {
        let mut graph = DraftGraph::with_base("atm", "http://example.com/atm#");
        graph.insert(Triple::new("atm:Card1", RDF_TYPE, Term::named("atm:CashCard")));
        graph.insert(Triple::new(
            "atm:Card2",
            RDF_TYPE,
            Term::named("atm:CashCard"),
        ));
        graph.insert(Triple::new(
            "atm:Card2",
            "atm:hasOwner",
            Term::named("atm:P1"),
        ));
        graph
    }

    #[tokio::test]
    async fn missing_required_property_is_hard() {
        let validator = RuleValidator::new(vec![Rule::RequiredProperty {
            target_class: "atm:CashCard".to_string(),
            property: "atm:hasOwner".to_string(),
            severity: Severity::Hard,
        }]);
        let outcome = validator.validate(&card_graph()).await;
        assert!(!outcome.conforms);
        assert_eq!(outcome.summary.hard, 1);
        assert_eq!(outcome.violations[0].focus.as_deref(), Some("atm:Card1"));
    }

    #[tokio::test]
    async fn invalid_typed_literal_is_flagged() {
        let mut graph = card_graph();
        graph.insert(Triple::new(
            "atm:Card1",
            "atm:amount",
            Term::typed("amount", "xsd:decimal"),
        ));
        let validator = RuleValidator::new(vec![Rule::LiteralDatatype {
            property: "atm:amount".to_string(),
            datatype: "xsd:decimal".to_string(),
            severity: Severity::Hard,
        }]);
        let outcome = validator.validate(&graph).await;
        assert_eq!(outcome.summary.hard, 1);
        assert_eq!(outcome.violations[0].observed.as_deref(), Some("amount"));
    }

    #[tokio::test]
    async fn disjoint_typing_is_hard() {
        let mut graph = card_graph();
        graph.insert(Triple::new("atm:Card1", RDF_TYPE, Term::named("atm:Person")));
        let validator = RuleValidator::new(vec![Rule::DisjointClasses {
            first: "atm:CashCard".to_string(),
            second: "atm:Person".to_string(),
        }]);
        let outcome = validator.validate(&graph).await;
        assert_eq!(outcome.summary.hard, 1);
    }

    #[tokio::test]
    async fn conformant_graph_conforms() {
        let validator = RuleValidator::new(vec![Rule::RequiredProperty {
            target_class: "atm:CashCard".to_string(),
            property: "atm:hasOwner".to_string(),
            severity: Severity::Soft,
        }]);
        let outcome = validator.validate(&card_graph()).await;
        assert!(outcome.conforms);
        assert_eq!(outcome.summary.soft, 1);
    }

    #[test]
    fn ruleset_parses_from_json() {
        let input = r#"[
            {"rule": "required_property", "target_class": "atm:CashCard", "property": "atm:hasOwner"},
            {"rule": "disjoint_classes", "first": "atm:CashCard", "second": "atm:Person"}
        ]"#;
        let validator = RuleValidator::from_json(input).unwrap();
        assert_eq!(validator.disjoint_pairs().len(), 1);
    }
}
