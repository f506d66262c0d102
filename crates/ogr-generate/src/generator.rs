//! Generator abstraction.
//!
//! Backends produce Turtle text from a prompt. The repair loop never talks
//! to a backend directly; it goes through [`Generator`] so caching, offline
//! fallbacks, and remote providers are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;

/// Structured context attached to a repair request.
///
/// Serialized into the prompt body so the model sees the current state of
/// the draft around the entities being repaired.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    /// Canonical violation lines from the latest validation pass
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
    /// Bounded Turtle snippet around the focus entities
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub snippet: String,
    /// Vocabulary terms the model should prefer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_terms: Vec<String>,
    /// `property -> class` domain hints from the registry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_hints: Vec<String>,
    /// `property -> class-or-datatype` range hints from the registry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub range_hints: Vec<String>,
    /// `alias -> canonical` synonym hints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonym_hints: Vec<String>,
    /// Inconsistency notes from the latest reasoner report
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inconsistencies: Vec<String>,
}

/// A single generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Prompt body
    pub prompt: String,
    /// Optional structured context for repair prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PromptContext>,
}

impl GenerateRequest {
    /// Plain prompt with no attached context.
    #[inline]
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
        }
    }

    /// Prompt with structured repair context.
    #[inline]
    #[must_use]
    pub fn with_context(prompt: impl Into<String>, context: PromptContext) -> Self {
        Self {
            prompt: prompt.into(),
            context: Some(context),
        }
    }

    /// Deterministic material for cache keying: the prompt plus the
    /// candidate-term snapshot, which is the only context field that
    /// changes a backend's vocabulary choices.
    #[must_use]
    pub fn cache_material(&self) -> String {
        let mut material = self.prompt.clone();
        if let Some(ctx) = &self.context {
            for term in &ctx.candidate_terms {
                material.push('\n');
                material.push_str(term);
            }
        }
        material
    }
}

/// A text-generation backend that turns requests into Turtle text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce raw Turtle text for the request. Output goes through the
    /// sanitizer before parsing; backends are not required to return
    /// syntactically clean text.
    async fn generate(&self, request: GenerateRequest) -> Result<String, GeneratorError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
