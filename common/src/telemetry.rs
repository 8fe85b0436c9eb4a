use crate::config::LoggingConfig;
use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::InvalidInput(format!("Invalid log level '{}': {}", config.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::Other(format!("Failed to install tracing subscriber: {}", e)))
}
