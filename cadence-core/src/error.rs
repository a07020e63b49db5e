//! Error types for Cadence

use thiserror::Error;

use crate::gate::{Finding, ReviewStatus};

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Cadence operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git read error
    #[error("Git error: {0}")]
    Git(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The agent session failed or produced no usable result
    #[error("Agent invocation failed: {0}")]
    Agent(String),

    /// No session id was ever observed on the event stream
    #[error("No session id observed during stage '{0}'")]
    NoSession(String),

    /// A policy was violated: mutating command out of turn, head guard
    /// tripped, missing commit after the committer stage, or a
    /// conventional-commit/trailer violation
    #[error("Policy violation: {0}")]
    Policy(String),

    /// The architecture review was enforced to Blocked
    #[error("Architecture review blocked: {summary}")]
    GateBlocked {
        summary: String,
        findings: Vec<Finding>,
    },

    /// The refactor cycle budget was exhausted while still non-passing
    #[error("Architecture gate still {status} after {cycles} refactor cycles")]
    GateExhausted { cycles: u32, status: ReviewStatus },
}
