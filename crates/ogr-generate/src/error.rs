//! Generator backend errors.

use thiserror::Error;

/// Errors from generator backends.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Transport-level failure talking to a remote backend
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Remote backend returned a non-success status
    #[error("backend returned {status}: {body}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Response body (truncated by the caller if large)
        body: String,
    },

    /// Backend response did not carry usable content
    #[error("empty or malformed backend response: {0}")]
    MalformedResponse(String),

    /// Required credential is missing from the environment
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// All retry attempts exhausted
    #[error("all {attempts} attempts failed; last: {last}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Description of the last failure
        last: String,
    },
}
