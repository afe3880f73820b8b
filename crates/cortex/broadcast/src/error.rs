//! Error types for the broadcast dispatcher and observers

use cortex_types::{ObserverId, ValidationError};
use thiserror::Error;

/// Errors surfaced to callers of the dispatcher.
///
/// Observer failures never appear here; they become error feedback.
#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("observer already registered: {0}")]
    ObserverAlreadyRegistered(ObserverId),

    #[error("observer not found: {0}")]
    ObserverNotFound(ObserverId),
}

/// Failure inside one observer's unit of work.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObserverError {
    #[error("processing failed: {0}")]
    Processing(String),

    #[error("invalid payload field '{field}': {reason}")]
    InvalidPayload { field: &'static str, reason: String },

    #[error("observer overloaded: capacity {capacity} reached")]
    Overloaded { capacity: usize },

    #[error("observer task panicked: {0}")]
    Panicked(String),
}

/// Result type for dispatcher operations.
pub type BroadcastResult<T> = Result<T, BroadcastError>;

/// Result type for observer processing.
pub type ObserverResult<T> = Result<T, ObserverError>;
