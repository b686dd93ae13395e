//! Domain errors - per-record failures raised while interpreting a delta

use thiserror::Error;

/// Domain layer errors
///
/// These occur at single-record granularity: one bad delta never poisons
/// the rest of its frame.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The record carries neither of the thread-key shapes
    #[error("record has no thread key")]
    MissingThreadKey,

    /// The record names no actor, or the actor id does not parse
    #[error("record has no usable actor id")]
    MissingActor,

    /// A required field is absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but has the wrong shape
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A timestamp field does not normalize
    #[error("invalid timestamp in field {0}")]
    InvalidTimestamp(&'static str),
}

impl DomainError {
    /// Stable machine-readable code for this error
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingThreadKey => "MISSING_THREAD_KEY",
            Self::MissingActor => "MISSING_ACTOR",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
        }
    }

    /// Create an invalid-field error
    #[must_use]
    pub fn invalid_field(field: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidField {
            field,
            reason: reason.to_string(),
        }
    }
}
