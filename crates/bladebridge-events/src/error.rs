//! Error types for event dispatching

use thiserror::Error;

/// Errors raised by the dispatcher or returned by listeners
#[derive(Debug, Error)]
pub enum EventError {
    /// A listener rejected the event
    #[error("Listener failed: {0}")]
    Listener(String),

    /// Listener storage could not be accessed
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for event operations
pub type Result<T> = std::result::Result<T, EventError>;
