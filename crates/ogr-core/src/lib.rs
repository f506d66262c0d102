//! OGR Core Layer
//!
//! The iterative ontology repair loop: validate, canonicalize, synthesize
//! patches, regenerate, merge, and decide when to stop.
//!
//! # Overview
//!
//! The core layer provides:
//! - **RepairLoop**: Orchestrator driving draft and repair iterations
//! - **RuleValidator**: Declarative constraint checks over the expanded graph
//! - **CompetencyRunner**: ASK-style queries matched against the graph
//! - **synthesize**: Deterministic patch plans from violations and failed queries
//! - **ReasonerAdapter**: Fault-absorbing consistency checking with input sanitation
//! - **StopEngine**: Four stop policies over per-iteration quality signals
//! - **ArtifactWriter**: Append-only per-iteration audit trail on disk
//!
//! # Example
//!
//! ```rust
//! use ogr_core::stop::{IterationSignals, StopEngine, StopPolicy};
//!
//! let engine = StopEngine::new(StopPolicy::Default, 3, 0.8, 0);
//! let decision = engine.evaluate(IterationSignals {
//!     iteration: 0,
//!     hard: 0,
//!     pass_rate: 1.0,
//!     patches: &[],
//!     previous_patches: None,
//!     patch_iterations: 0,
//! });
//! assert!(decision.stop);
//! ```

#![warn(missing_docs)]

pub mod artifacts;
pub mod competency;
pub mod config;
pub mod datatype;
pub mod error;
pub mod patch;
pub mod reasoner;
pub mod repair;
pub mod stop;
pub mod validator;
pub mod violation;

// Re-exports
pub use artifacts::{ArtifactWriter, IterationRecord, RunLog};
pub use competency::{pass_rate, CompetencyOutcome, CompetencyRunner};
pub use config::RepairConfig;
pub use error::{ConfigError, RepairError};
pub use patch::{plans_equal, synthesize, Patch, PatchAction};
pub use reasoner::{RdfsReasoner, Reasoner, ReasonerAdapter, ReasonerReport};
pub use repair::{RepairLoop, RunSummary};
pub use stop::{IterationSignals, StopDecision, StopEngine, StopPolicy, StopReason};
pub use validator::{ConstraintValidator, Rule, RuleValidator, ValidationOutcome};
pub use violation::{canonicalize, render_report, CanonicalViolation, Severity, Violation};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the repair loop
    pub use crate::{
        CanonicalViolation, CompetencyRunner, ConstraintValidator, Patch, PatchAction,
        RdfsReasoner, ReasonerAdapter, RepairConfig, RepairError, RepairLoop, RuleValidator,
        RunSummary, Severity, StopDecision, StopEngine, StopPolicy, StopReason, ValidationOutcome,
        Violation,
    };
}
