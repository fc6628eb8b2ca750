//! Event and listener types

use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::error::Result;

/// Something that happened, with a JSON payload
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Event name, e.g. `composing: welcome`
    pub name: String,
    /// Event payload
    pub payload: serde_json::Value,
    /// When the event was created
    pub timestamp: SystemTime,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: SystemTime::now(),
        }
    }
}

/// Callback invoked for matching events
pub type Listener = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;
