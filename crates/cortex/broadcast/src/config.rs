//! Dispatcher configuration

use std::time::Duration;

use cortex_types::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// Broadcast dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Timeout applied to each observer's unit of work, in seconds.
    #[serde(default = "default_per_observer_timeout_secs")]
    pub per_observer_timeout_secs: f64,

    /// Bound of the broadcast history.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            per_observer_timeout_secs: default_per_observer_timeout_secs(),
            max_history: default_max_history(),
        }
    }
}

impl BroadcastConfig {
    pub fn validate(&self) -> ValidationResult<()> {
        self.per_observer_timeout().map(|_| ())
    }

    /// The per-observer timeout as a [`Duration`].
    ///
    /// Fails for values that are not finite and > 0, or too large to
    /// represent.
    pub fn per_observer_timeout(&self) -> ValidationResult<Duration> {
        let t = self.per_observer_timeout_secs;
        if !t.is_finite() || t <= 0.0 {
            return Err(ValidationError::config(
                "per_observer_timeout_secs",
                format!("{t} must be finite and > 0"),
            ));
        }
        Duration::try_from_secs_f64(t).map_err(|e| {
            ValidationError::config("per_observer_timeout_secs", format!("{t} out of range: {e}"))
        })
    }
}

fn default_per_observer_timeout_secs() -> f64 {
    0.1
}

fn default_max_history() -> usize {
    100
}
