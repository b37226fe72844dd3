//! Error types for the waitlist core.

use crate::entrant::EntrantId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for waitlist core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the allocator, re-sequencer and intake validators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The moving entrant is not part of the supplied snapshot.
    #[error("entrant not found: {0}")]
    NotFound(EntrantId),

    /// The requested target position was non-numeric or out of range.
    #[error("invalid target position: {0}")]
    InvalidTarget(String),

    /// One or more intake fields failed validation.
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// The waitlist positions are not a contiguous `1..N` sequence.
    #[error("waitlist inconsistent: {0}")]
    Inconsistent(String),
}

/// A single rejected intake field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in the form payload
    pub field: String,

    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
