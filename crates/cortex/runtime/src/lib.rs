//! Cortex Runtime - composition root for broadcast and arbitration
//!
//! ```no_run
//! use cortex_runtime::{init_tracing, CognitiveCore, CortexConfig};
//!
//! # fn main() -> cortex_runtime::RuntimeResult<()> {
//! let config = CortexConfig::load(Some("cortex.toml"))?;
//! init_tracing(&config.logging);
//! let core = CognitiveCore::with_default_observers(config)?;
//! // ... publish events, submit demands, arbitrate ...
//! core.shutdown();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod cognitive;
pub mod config;
pub mod error;
pub mod telemetry;

pub use crate::cognitive::CognitiveCore;
pub use crate::config::{CortexConfig, LoggingConfig, ENV_PREFIX};
pub use crate::error::{RuntimeError, RuntimeResult};
pub use crate::telemetry::init_tracing;
