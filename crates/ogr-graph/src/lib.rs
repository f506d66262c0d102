//! OGR Graph Layer
//!
//! Triple store, Turtle subset codec, and generator-output sanitation.
//!
//! # Overview
//!
//! The graph layer provides:
//! - **DraftGraph**: Insertion-ordered, deduplicating triple store
//! - **turtle**: Parser and serializer for the Turtle subset the pipeline speaks
//! - **Sanitizer**: Mechanical repair of malformed generator output
//! - **TermRegistry**: Vocabulary derived from the current graph
//! - **Merger**: Policy-gated merge of sanitized batches
//! - **ContextExtractor**: Bounded neighborhoods for repair prompts
//!
//! # Example
//!
//! ```rust
//! use ogr_graph::{DraftGraph, Term, Triple};
//!
//! let mut graph = DraftGraph::with_base("atm", "http://example.com/atm#");
//! graph.insert(Triple::new("atm:Card1", "rdf:type", Term::named("atm:CashCard")));
//! assert_eq!(graph.len(), 1);
//!
//! // Re-inserting the same triple is a no-op
//! assert!(!graph.insert(Triple::new("atm:Card1", "rdf:type", Term::named("atm:CashCard"))));
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod merge;
pub mod registry;
pub mod sanitize;
pub mod triple;
pub mod turtle;

// Re-exports
pub use context::{ContextExtractor, ContextSnippet, PathSpec};
pub use error::{ParseError, SanitizeError};
pub use merge::{MergeOutcome, MergePolicy, Merger};
pub use registry::TermRegistry;
pub use sanitize::Sanitizer;
pub use triple::{DraftGraph, Literal, Term, Triple, RDF_TYPE, STANDARD_PREFIXES};
pub use turtle::{parse, serialize, ParsedDocument};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for graph operations
    pub use crate::{
        ContextExtractor, ContextSnippet, DraftGraph, Literal, MergeOutcome, MergePolicy, Merger,
        ParseError, PathSpec, SanitizeError, Sanitizer, Term, TermRegistry, Triple, RDF_TYPE,
    };
}
