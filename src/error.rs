//! Engine fault taxonomy
//!
//! Invocation faults are deliberately NOT represented here: a failing
//! callable is data (`ExecutionReport { success: false, .. }`), since a
//! function was still identified and dispatched.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No matcher tier produced a candidate.
    #[error("No matching function found for your request.")]
    NoMatch,

    /// Required parameters were declared but not found in the prompt.
    #[error("Missing required parameters: {}", .missing.join(", "))]
    MissingParameters { missing: Vec<String> },

    /// A namespace could not be introspected at all.
    #[error("Error registering functions from {namespace}: {reason}")]
    Registration { namespace: String, reason: String },

    /// The index blob could not be written. Recovered by callers; the
    /// in-memory index stays authoritative.
    #[error("Index persistence failed: {0}")]
    Persistence(String),
}

impl EngineError {
    pub fn missing(missing: Vec<String>) -> Self {
        Self::MissingParameters { missing }
    }
}
