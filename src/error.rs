//! Errors raised by the pure grading core.
//!
//! Storage and CLI layers wrap these in [`anyhow::Error`].

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GradingError {
    /// The assignment's total marks cannot be used as a divisor.
    #[error("invalid assignment configuration: total marks must be positive, got {total_marks}")]
    InvalidAssignmentConfiguration { total_marks: f64 },

    /// Only raised under [`ScorePolicy::Reject`](crate::grading::score::ScorePolicy::Reject).
    #[error("score {score} is outside [0, {total_marks}]")]
    ScoreOutOfRange { score: f64, total_marks: f64 },

    #[error("invalid grade band table: {0}")]
    InvalidBandTable(String),

    #[error("submission '{id}' is not graded")]
    NotGraded { id: String },

    #[error("submission '{id}' is inconsistent: {reason}")]
    InvariantViolation { id: String, reason: String },
}

pub type GradingResult<T> = Result<T, GradingError>;
