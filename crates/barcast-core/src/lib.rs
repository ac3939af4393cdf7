pub mod config;
pub mod error;
pub mod notify;

pub use config::{Config, LocationConfig, TemperatureUnit, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, WeatherError};
pub use notify::notify_user;

use anyhow::Result;

/// Initialize logging.
///
/// Logs go to stderr; stdout carries the single JSON line read by the bar.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("barcast core initialized");
    Ok(())
}
