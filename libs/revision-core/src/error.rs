//! Error types for revision-core.

use thiserror::Error;

use crate::session::{SessionPhase, StudyMode};

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Input rejected before it reaches any store or network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("completion percentage {value} is above 100")]
    PercentageOutOfRange { value: u32 },

    #[error("completed item must be at 100%, got {value}")]
    CompletedBelowFull { value: u32 },
}

/// Illegal transitions of the study session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is {phase:?}, expected {expected:?}")]
    InvalidPhase {
        phase: SessionPhase,
        expected: SessionPhase,
    },

    #[error("operation not available in {mode:?} mode")]
    WrongMode { mode: StudyMode },

    #[error("match card index {index} out of range ({len} cards)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("match card {index} is already matched")]
    AlreadyMatched { index: usize },
}
