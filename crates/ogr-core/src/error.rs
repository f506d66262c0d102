//! Error taxonomy for the repair loop.

use thiserror::Error;

/// Startup configuration errors. These fail fast, before any iteration runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Iteration cap must be at least one
    #[error("max_iterations must be positive, got {0}")]
    NonPositiveCap(u64),

    /// Pass-rate threshold outside [0, 1]
    #[error("cq_threshold must be within [0.0, 1.0], got {0}")]
    ThresholdOutOfRange(f64),

    /// Stop policy name not in the closed set
    #[error("unsupported stop policy '{0}'")]
    UnknownPolicy(String),

    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for the expected shape
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures that abort a repair run.
///
/// Degraded validator and reasoner results are not errors; they surface as
/// notes inside their reports and the loop continues. Only unrecoverable
/// conditions land here.
#[derive(Debug, Error)]
pub enum RepairError {
    /// Generator output stayed unparseable after every sanitizer repair.
    /// The raw text and reason are already persisted to the iteration
    /// artifacts when this is returned.
    #[error("iteration {iteration}: generator output unrecoverable: {reason}")]
    UnrecoverableParse {
        /// Iteration at which the run aborted
        iteration: u64,
        /// Why the sanitized text still failed to parse
        reason: ogr_graph::ParseError,
        /// The raw generator output
        raw: String,
    },

    /// Generator backend failed outright (after its own retries)
    #[error(transparent)]
    Generator(#[from] ogr_generate::GeneratorError),

    /// Requirement corpus failed to load
    #[error(transparent)]
    Requirements(#[from] ogr_generate::RequirementError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Artifact persistence failed
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact serialization failed
    #[error("artifact serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
