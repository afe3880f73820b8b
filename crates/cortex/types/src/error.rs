use thiserror::Error;

/// Construction-time validation failures.
///
/// These are surfaced immediately to the caller and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("ignition strength {0} outside [0, 1]")]
    IgnitionOutOfRange(f64),

    #[error("{field} = {value} outside [0, 1]")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for validated construction.
pub type ValidationResult<T> = Result<T, ValidationError>;
