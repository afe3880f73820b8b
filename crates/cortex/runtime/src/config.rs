//! Configuration for the cognitive core

use cortex_arbitration::{CompetitionConfig, PoolConfig};
use cortex_broadcast::BroadcastConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RuntimeResult;

/// Environment variable prefix; nested keys are separated by `__`,
/// e.g. `CORTEX_BROADCAST__MAX_HISTORY=50`.
pub const ENV_PREFIX: &str = "CORTEX";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CortexConfig {
    /// Broadcast dispatcher configuration
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Competition engine configuration
    #[serde(default)]
    pub competition: CompetitionConfig,

    /// Resource pool configuration
    #[serde(default)]
    pub pool: PoolConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            timestamps: true,
        }
    }
}

impl CortexConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `CORTEX_`-prefixed environment variables. The result is validated.
    pub fn load(path: Option<&str>) -> RuntimeResult<Self> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&CortexConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            debug!(path, "Loading configuration file");
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with CORTEX_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: CortexConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> RuntimeResult<()> {
        self.broadcast.validate()?;
        self.competition.validate()?;
        Ok(())
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CortexConfig::default();
        assert_eq!(config.broadcast.per_observer_timeout_secs, 0.1);
        assert_eq!(config.broadcast.max_history, 100);
        assert_eq!(config.competition.iterations, 10);
        assert_eq!(config.competition.inhibition_strength, 0.3);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_catches_bad_section() {
        let mut config = CortexConfig::default();
        config.competition.inhibition_strength = 2.0;
        assert!(config.validate().is_err());
    }
}
