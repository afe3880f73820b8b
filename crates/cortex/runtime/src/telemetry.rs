//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Returns `false` when a
/// subscriber was already installed, which leaves it in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    let installed = match (config.json, config.timestamps) {
        (true, _) => subscriber
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init(),
        (false, true) => subscriber.with(fmt::layer().with_target(true)).try_init(),
        (false, false) => subscriber
            .with(fmt::layer().with_target(true).without_time())
            .try_init(),
    };
    installed.is_ok()
}
