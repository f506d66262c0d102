//! Testing utilities for the OGR workspace
//!
//! Scripted generator and validator doubles, plus small graph fixtures.

#![allow(missing_docs)]

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use ogr_core::validator::{ConstraintValidator, ValidationOutcome};
use ogr_core::violation::{Severity, Violation};
use ogr_generate::{GenerateRequest, Generator, GeneratorError, Requirement};
use ogr_graph::{DraftGraph, Term, Triple};

/// A generator that replays canned responses in order. Once the script is
/// exhausted every further call fails, so tests notice extra calls.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _request: GenerateRequest) -> Result<String, GeneratorError> {
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| GeneratorError::MalformedResponse("script exhausted".to_string()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A validator that replays queued outcomes; a conforming outcome once the
/// queue runs dry.
#[derive(Default)]
pub struct ScriptedValidator {
    outcomes: Mutex<VecDeque<ValidationOutcome>>,
}

impl ScriptedValidator {
    pub fn new(outcomes: Vec<ValidationOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
        }
    }
}

#[async_trait]
impl ConstraintValidator for ScriptedValidator {
    async fn validate(&self, _graph: &DraftGraph) -> ValidationOutcome {
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| ValidationOutcome::from_violations(Vec::new()))
    }
}

/// A small card-and-owner graph used across loop tests.
pub fn card_graph() -> DraftGraph {
    let mut graph = DraftGraph::with_base("atm", "http://example.com/atm#");
    graph.insert(Triple::new("atm:CashCard", "rdf:type", Term::named("owl:Class")));
    graph.insert(Triple::new("atm:Person", "rdf:type", Term::named("owl:Class")));
    graph.insert(Triple::new(
        "atm:hasOwner",
        "rdf:type",
        Term::named("owl:ObjectProperty"),
    ));
    graph.insert(Triple::new("atm:hasOwner", "rdfs:domain", Term::named("atm:CashCard")));
    graph.insert(Triple::new("atm:hasOwner", "rdfs:range", Term::named("atm:Person")));
    graph.insert(Triple::new("atm:Card1", "rdf:type", Term::named("atm:CashCard")));
    graph
}

/// A hard required-property violation against `focus`.
pub fn hard_violation(focus: &str, path: &str) -> Violation {
    Violation {
        focus: Some(focus.to_string()),
        path: Some(path.to_string()),
        message: format!("{focus} is missing {path}"),
        constraint: "required_property".to_string(),
        severity: Severity::Hard,
        expected: None,
        observed: None,
    }
}

/// One-line requirement fixtures.
pub fn sample_requirements() -> Vec<Requirement> {
    vec![
        Requirement::new("R1", "The customer inserts a cash card into the ATM."),
        Requirement::new("R2", "The bank verifies the account before dispensing cash."),
    ]
}
