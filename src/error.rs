//! Error types shared across the solver.
//!
//! All errors are fatal for the run they occur in: the engine never retries or
//! skips individuals. Callers decide whether to abort the process or start a
//! fresh run.

use thiserror::Error;

/// Errors produced by the solver core and the instance loader.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Unknown method/criterion/parameter name or an out-of-range parameter.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A broken internal invariant (invalid permutation, length mismatch).
    /// Indicates a programming defect, not a recoverable runtime condition.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Malformed instance data.
    #[error("data error: {0}")]
    Data(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;
