//! Cortex Types - shared value types for broadcast and arbitration
//!
//! Events and consumer feedback flow through the broadcast dispatcher;
//! resource vectors and demands flow through the competition engine.
//! All of them are plain values: once constructed they are safe to read
//! from any number of tasks without synchronization.
//!
//! Construction validates the numeric invariants (ignition strength,
//! importance, progress and every resource component live in `[0, 1]`),
//! so downstream code never has to re-check them.

#![deny(unsafe_code)]

pub mod demand;
pub mod error;
pub mod event;
pub mod resources;

pub use demand::{
    ActivationState, Demand, DemandBuilder, DemandId, DemandRelationships, DemandState,
};
pub use error::{ValidationError, ValidationResult};
pub use event::{ConsumerFeedback, ContentType, Event, EventId, ObserverId, TIMEOUT_ERROR};
pub use resources::{CognitiveResources, ResourceDimension};

/// Check that a value is finite and lies in `[0, 1]`.
pub(crate) fn check_unit(field: &'static str, value: f64) -> ValidationResult<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_interval_bounds_are_inclusive() {
        assert!(check_unit("x", 0.0).is_ok());
        assert!(check_unit("x", 1.0).is_ok());
        assert!(check_unit("x", -0.01).is_err());
        assert!(check_unit("x", 1.01).is_err());
        assert!(check_unit("x", f64::NAN).is_err());
    }
}
