//! Structured logging setup.

use crate::config::{LogConfig, LogFormat};
use crate::error::ConsoleError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init(config: &LogConfig) -> Result<(), ConsoleError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| ConsoleError::Telemetry(format!("invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| ConsoleError::Telemetry(format!("Failed to init subscriber: {}", e)))?;

    tracing::debug!(format = ?config.format, filter = %config.filter, "Telemetry initialized");
    Ok(())
}
