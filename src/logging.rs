//! Logger setup for embedding hosts

use crate::config::LoggingConfig;

/// Install an `env_logger` using the configured level as the default
/// filter. `RUST_LOG` still wins. Calling this twice is harmless.
pub fn init(config: &LoggingConfig) {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.level.as_str()),
    )
    .format_timestamp_millis()
    .try_init();
}
