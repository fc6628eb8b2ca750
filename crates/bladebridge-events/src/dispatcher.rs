//! Event routing

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::{
    error::{EventError, Result},
    types::{Event, Listener},
};

/// Routes events to listeners
pub trait EventDispatcher: Send + Sync {
    /// Subscribe a listener to an event name, or to a prefix pattern ending in `*`
    fn listen(&self, pattern: &str, listener: Listener) -> Result<()>;

    /// Deliver an event to every matching listener, in registration order
    ///
    /// A failing listener does not stop the others. An error is returned only when every
    /// matching listener failed.
    fn dispatch(&self, event: Event) -> Result<()>;

    /// Whether any listener matches the event name
    fn has_listeners(&self, name: &str) -> bool;

    /// Remove every listener registered under exactly this pattern
    fn forget(&self, pattern: &str) -> Result<()>;
}

/// Default in-memory dispatcher
#[derive(Clone, Default)]
pub struct Dispatcher {
    listeners: Arc<RwLock<Vec<(String, Listener)>>>,
}

impl Dispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, name: &str) -> Result<Vec<Listener>> {
        let listeners = self
            .listeners
            .read()
            .map_err(|e| EventError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(listeners
            .iter()
            .filter(|(pattern, _)| pattern_matches(pattern, name))
            .map(|(_, listener)| Arc::clone(listener))
            .collect())
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

impl EventDispatcher for Dispatcher {
    fn listen(&self, pattern: &str, listener: Listener) -> Result<()> {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|e| EventError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        listeners.push((pattern.to_string(), listener));
        Ok(())
    }

    fn dispatch(&self, event: Event) -> Result<()> {
        // Collected before invoking so listeners may register further listeners.
        let listeners = self.matching(&event.name)?;
        if listeners.is_empty() {
            return Ok(());
        }

        debug!(event = %event.name, listener_count = listeners.len(), "Dispatching event");

        let mut failures = Vec::new();
        for listener in &listeners {
            if let Err(e) = listener(&event) {
                warn!(event = %event.name, error = %e, "Event listener failed");
                failures.push(e.to_string());
            }
        }

        if failures.len() == listeners.len() {
            return Err(EventError::Listener(format!(
                "All listeners failed for '{}': {}",
                event.name,
                failures.join("; ")
            )));
        }

        Ok(())
    }

    fn has_listeners(&self, name: &str) -> bool {
        self.matching(name).map(|l| !l.is_empty()).unwrap_or(false)
    }

    fn forget(&self, pattern: &str) -> Result<()> {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|e| EventError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        listeners.retain(|(registered, _)| registered != pattern);
        Ok(())
    }
}
