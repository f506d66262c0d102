//! Prompt construction for drafting and repair.
//!
//! Drafting prompts carry a requirement batch; repair prompts embed the
//! canonical violation report, the serialized patch plan, and a bounded
//! context snippet. Structured payloads are serialized as JSON so the
//! backend sees an unambiguous envelope rather than free prose.

use serde_json::json;

use crate::generator::{GenerateRequest, PromptContext};
use crate::requirement::Requirement;

/// Builds draft and repair prompts against a fixed namespace.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    base_prefix: String,
    base_iri: String,
}

impl PromptBuilder {
    /// Builder for the given base namespace.
    #[inline]
    #[must_use]
    pub fn new(base_prefix: impl Into<String>, base_iri: impl Into<String>) -> Self {
        Self {
            base_prefix: base_prefix.into(),
            base_iri: base_iri.into(),
        }
    }

    /// Drafting prompt for one requirement batch.
    #[must_use]
    pub fn draft(&self, batch: &[Requirement]) -> GenerateRequest {
        let payload = json!({
            "task": "draft",
            "namespace": { "prefix": self.base_prefix, "iri": self.base_iri },
            "requirements": batch.iter().map(|req| {
                json!({
                    "identifier": req.identifier,
                    "title": req.title,
                    "text": req.text,
                    "boilerplate": req.boilerplate,
                })
            }).collect::<Vec<_>>(),
        });
        let prompt = format!(
            "You are drafting OWL/Turtle axioms for the {prefix}: ontology with namespace <{iri}>.\n\
             Convert each requirement below into a coherent Turtle snippet introducing relevant \
             classes, object properties, datatype properties, and restrictions. Use descriptive \
             rdfs:comment statements to cite the original requirement. Emit only syntactically \
             valid Turtle with the {prefix}: prefix.\n\n{body}",
            prefix = self.base_prefix,
            iri = self.base_iri,
            body = serde_json::to_string_pretty(&payload).unwrap_or_default(),
        );
        GenerateRequest::new(prompt)
    }

    /// Repair prompt embedding the patch plan and the surrounding context.
    /// `patch_plan` is the serialized plan as written to the iteration
    /// artifacts, so prompt and audit trail always agree.
    #[must_use]
    pub fn repair(&self, patch_plan: &serde_json::Value, context: PromptContext) -> GenerateRequest {
        let payload = json!({
            "task": "repair",
            "namespace": { "prefix": self.base_prefix, "iri": self.base_iri },
            "patches": patch_plan,
            "violations": context.violations,
            "context_turtle": context.snippet,
            "vocabulary": {
                "terms": context.candidate_terms,
                "domains": context.domain_hints,
                "ranges": context.range_hints,
                "synonyms": context.synonym_hints,
            },
            "inconsistencies": context.inconsistencies,
        });
        let prompt = format!(
            "The previous attempt at the {prefix}: ontology triggered validation issues.\n\
             Apply every patch in the plan below, preferring the listed vocabulary terms, and \
             return an improved Turtle snippet that resolves the problems while preserving the \
             intent of the original requirements. Emit only syntactically valid Turtle.\n\n{body}",
            prefix = self.base_prefix,
            body = serde_json::to_string_pretty(&payload).unwrap_or_default(),
        );
        GenerateRequest::with_context(prompt, context)
    }
}
