//! Logging setup

use bladebridge_config::LoggingConfig;
use tracing::Level;

use crate::error::{BladeError, Result};

/// Install a global `tracing` subscriber writing to stderr at the configured level
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = parse_level(&config.level)?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| BladeError::Logging(format!("Failed to install subscriber: {}", e)))
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(BladeError::Logging(format!("Unknown log level: {}", other))),
    }
}
