//! Error types for the bridge facade

use bladebridge_config::ConfigError;
use bladebridge_view::ViewError;
use thiserror::Error;

/// Errors raised by the bridge
#[derive(Debug, Error)]
pub enum BladeError {
    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Invalid view data: {0}")]
    Data(#[from] serde_json::Error),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BladeError>;
