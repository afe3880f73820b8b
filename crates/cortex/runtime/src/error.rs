use cortex_arbitration::ArbitrationError;
use cortex_broadcast::BroadcastError;
use cortex_types::ValidationError;
use thiserror::Error;

/// Errors from the cognitive core and its setup.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("arbitration error: {0}")]
    Arbitration(#[from] ArbitrationError),

    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),

    #[error("cognitive core has been shut down")]
    ShutDown,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
