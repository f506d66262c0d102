//! Deterministic offline backend.
//!
//! Rule-based fallback for experimentation without a remote model: keyword
//! extraction maps each requirement to a subject/predicate/object skeleton,
//! and patch plans are applied literally. Output goes through the same
//! sanitizer path as remote output, so tests exercise the full pipeline.

use std::fmt::Write as _;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::error::GeneratorError;
use crate::generator::{GenerateRequest, Generator};
use crate::requirement::Requirement;

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").unwrap())
}

fn underscore_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").unwrap())
}

/// Collapse a free-text label to a safe local name.
#[must_use]
pub fn slugify(label: &str) -> String {
    let collapsed = non_word_re().replace_all(label.trim(), "_");
    let collapsed = underscore_run_re().replace_all(&collapsed, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        return "Concept".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("C_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// The structured payload the prompt builder embeds in each prompt.
#[derive(Debug, Deserialize)]
struct Envelope {
    task: String,
    #[serde(default)]
    requirements: Vec<Requirement>,
    #[serde(default)]
    patches: serde_json::Value,
}

/// One entry of a serialized patch plan.
#[derive(Debug, Deserialize)]
struct PatchEntry {
    #[serde(default)]
    action: String,
    #[serde(alias = "subject")]
    focus: String,
    #[serde(alias = "predicate")]
    path: String,
    #[serde(default, alias = "object")]
    value: Option<String>,
}

/// Rule-based offline generator.
#[derive(Debug, Clone)]
pub struct HeuristicGenerator {
    base_prefix: String,
    base_iri: String,
}

impl HeuristicGenerator {
    /// Generator emitting into the given base namespace.
    #[inline]
    #[must_use]
    pub fn new(base_prefix: impl Into<String>, base_iri: impl Into<String>) -> Self {
        let mut iri = base_iri.into();
        if !iri.ends_with('#') && !iri.ends_with('/') {
            iri.push('#');
        }
        Self {
            base_prefix: base_prefix.into(),
            base_iri: iri,
        }
    }

    fn header(&self) -> String {
        format!(
            "@prefix {p}: <{iri}> .\n\
             @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .\n\
             @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
             @prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
             @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n",
            p = self.base_prefix,
            iri = self.base_iri,
        )
    }

    /// Draft Turtle axioms for a requirement batch.
    #[must_use]
    pub fn draft_axioms(&self, batch: &[Requirement]) -> String {
        let p = &self.base_prefix;
        let mut out = self.header();
        for req in batch {
            let subject = extract_subject(&req.text);
            let object = extract_object(&req.text);
            let prop = slugify(extract_predicate(&req.text));
            let _ = writeln!(
                out,
                "{p}:{prop} a owl:ObjectProperty ; rdfs:domain {p}:{subject} ; rdfs:range {p}:{object} ."
            );
            let _ = writeln!(out, "{p}:{subject} a owl:Class .");
            let _ = writeln!(out, "{p}:{object} a owl:Class .");
            let _ = writeln!(
                out,
                "{p}:{subject}_{prop}_{object} a owl:Axiom ; {p}:sourceRequirement \"{id}\" .",
                id = req.identifier,
            );
        }
        out
    }

    /// Apply a serialized patch plan, emitting one Turtle block per patch.
    ///
    /// An `xsd:`-typed value becomes a placeholder literal of that type; a
    /// class value seeds a fresh individual with a type assertion; a
    /// subclass action becomes an `rdfs:subClassOf` axiom with class
    /// declarations for both sides.
    #[must_use]
    pub fn apply_patches(&self, plan: &serde_json::Value) -> String {
        let mut out = self.header();
        let entries: Vec<PatchEntry> =
            serde_json::from_value(plan.clone()).unwrap_or_default();
        for patch in entries {
            let value = patch.value.as_deref().unwrap_or("xsd:string");
            if patch.action == "addSubclass" {
                let _ = writeln!(out, "{} rdfs:subClassOf {} .", patch.focus, value);
                let _ = writeln!(out, "{} a owl:Class .", patch.focus);
                let _ = writeln!(out, "{value} a owl:Class .");
            } else if value.starts_with("xsd:") {
                let _ = writeln!(
                    out,
                    "{} {} \"{}\"^^{} .",
                    patch.focus,
                    patch.path,
                    placeholder_for(value),
                    value,
                );
            } else {
                let seed = format!("{value}_seed");
                let _ = writeln!(out, "{} {} {seed} .", patch.focus, patch.path);
                let _ = writeln!(out, "{seed} a {value} .");
            }
        }
        out
    }
}

fn placeholder_for(datatype: &str) -> &'static str {
    match datatype {
        "xsd:integer" | "xsd:int" | "xsd:long" => "0",
        "xsd:decimal" | "xsd:double" | "xsd:float" => "0.0",
        "xsd:boolean" => "false",
        "xsd:dateTime" => "2000-01-01T00:00:00",
        _ => "placeholder",
    }
}

fn extract_subject(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("customer") {
        "Customer"
    } else if lower.contains("bank") {
        "Bank"
    } else {
        "ATM"
    }
}

fn extract_object(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("transaction") {
        "Transaction"
    } else if lower.contains("card") {
        "CashCard"
    } else if lower.contains("account") {
        "Account"
    } else {
        "RequirementTarget"
    }
}

fn extract_predicate(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("log") {
        "logs"
    } else if lower.contains("verify") {
        "verifies"
    } else if lower.contains("dispense") {
        "dispenses"
    } else if lower.contains("maintain") {
        "maintains"
    } else {
        "relatesTo"
    }
}

#[async_trait]
impl Generator for HeuristicGenerator {
    async fn generate(&self, request: GenerateRequest) -> Result<String, GeneratorError> {
        // the prompt text ends with the structured JSON envelope
        let payload = request
            .prompt
            .find('{')
            .map(|start| &request.prompt[start..])
            .ok_or_else(|| {
                GeneratorError::MalformedResponse("prompt carries no structured payload".into())
            })?;
        let envelope: Envelope = serde_json::from_str(payload)
            .map_err(|e| GeneratorError::MalformedResponse(e.to_string()))?;
        match envelope.task.as_str() {
            "draft" => Ok(self.draft_axioms(&envelope.requirements)),
            "repair" => Ok(self.apply_patches(&envelope.patches)),
            other => Err(GeneratorError::MalformedResponse(format!(
                "unknown task '{other}'"
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptBuilder;
    use ogr_graph::turtle;
    use pretty_assertions::assert_eq;

    #[test]
    fn slugify_handles_awkward_labels() {
        assert_eq!(slugify("  logs every  thing "), "logs_every_thing");
        assert_eq!(slugify("!!!"), "Concept");
        assert_eq!(slugify("3rdParty"), "C_3rdParty");
    }

    #[test]
    fn draft_output_parses() {
        let generator = HeuristicGenerator::new("atm", "http://example.com/atm#");
        let batch = vec![
            Requirement::new("REQ-1", "The bank must verify the cash card."),
            Requirement::new("REQ-2", "The ATM logs every transaction."),
        ];
        let turtle_text = generator.draft_axioms(&batch);
        let doc = turtle::parse(&turtle_text).unwrap();
        assert!(doc
            .triples
            .iter()
            .any(|t| t.subject == "atm:verifies" && t.predicate == "rdfs:domain"));
        assert!(doc.triples.iter().any(|t| t.subject == "atm:logs"));
    }

    #[test]
    fn patches_become_triples() {
        let generator = HeuristicGenerator::new("atm", "http://example.com/atm#");
        let plan = serde_json::json!([
            {"action": "addProperty", "focus": "atm:Card1", "path": "atm:amount", "value": "xsd:decimal"},
            {"action": "addProperty", "focus": "atm:Card1", "path": "atm:hasOwner", "value": "atm:Customer"},
            {"action": "addSubclass", "focus": "atm:CashCard", "path": "rdfs:subClassOf", "value": "atm:Card"},
        ]);
        let turtle_text = generator.apply_patches(&plan);
        let doc = turtle::parse(&turtle_text).unwrap();
        assert!(doc.triples.iter().any(|t| {
            t.subject == "atm:Card1"
                && t.predicate == "atm:amount"
                && t.object.as_literal().is_some_and(|l| l.lexical == "0.0")
        }));
        assert!(doc
            .triples
            .iter()
            .any(|t| t.subject == "atm:Customer_seed" && t.predicate == "rdf:type"));
        assert!(doc
            .triples
            .iter()
            .any(|t| t.subject == "atm:CashCard" && t.predicate == "rdfs:subClassOf"));
    }

    #[tokio::test]
    async fn round_trips_through_prompt_builder() {
        let builder = PromptBuilder::new("atm", "http://example.com/atm#");
        let generator = HeuristicGenerator::new("atm", "http://example.com/atm#");
        let request = builder.draft(&[Requirement::new("REQ-1", "Dispense cash for the account.")]);
        let output = generator.generate(request).await.unwrap();
        assert!(output.contains("atm:dispenses"));
        turtle::parse(&output).unwrap();
    }
}
