//! OGR Generation Layer
//!
//! Generator abstraction, prompt construction, and backends.
//!
//! # Overview
//!
//! The generation layer provides:
//! - **Generator**: Async trait every backend implements
//! - **PromptBuilder**: Draft and repair prompt envelopes
//! - **CachedGenerator**: SHA-256 keyed response cache decorator
//! - **HeuristicGenerator**: Deterministic offline backend
//! - **OpenAiGenerator**: Chat-completions backend with bounded retries
//! - **Requirement**: Input corpus records and batching

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod generator;
pub mod heuristic;
pub mod openai;
pub mod prompt;
pub mod requirement;

// Re-exports
pub use cache::CachedGenerator;
pub use error::GeneratorError;
pub use generator::{GenerateRequest, Generator, PromptContext};
pub use heuristic::HeuristicGenerator;
pub use openai::{OpenAiConfig, OpenAiGenerator};
pub use prompt::PromptBuilder;
pub use requirement::{chunk, from_jsonl, Requirement, RequirementError};
