use cortex_types::{DemandId, DemandState, ValidationError};
use thiserror::Error;

/// Errors from the arbitration subsystem.
///
/// Allocation refusal is not an error; it surfaces as a waiting demand.
#[derive(Error, Debug)]
pub enum ArbitrationError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("duplicate demand id in competition set: {0}")]
    DuplicateDemand(DemandId),

    #[error("demand not found: {0}")]
    DemandNotFound(DemandId),

    #[error("invalid transition for demand {demand}: {from} -> {to}")]
    InvalidTransition {
        demand: DemandId,
        from: DemandState,
        to: DemandState,
    },
}

/// Result type for arbitration operations.
pub type ArbitrationResult<T> = Result<T, ArbitrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ArbitrationError::InvalidTransition {
            demand: DemandId::new("g1"),
            from: DemandState::Completed,
            to: DemandState::Active,
        };
        let msg = err.to_string();
        assert!(msg.contains("g1"));
        assert!(msg.contains("completed"));
        assert!(msg.contains("active"));
    }

    #[test]
    fn validation_converts() {
        let err: ArbitrationError = ValidationError::IgnitionOutOfRange(2.0).into();
        assert!(matches!(err, ArbitrationError::Validation(_)));
    }
}
