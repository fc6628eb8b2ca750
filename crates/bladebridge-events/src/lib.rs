//! Event dispatcher for the bladebridge view factory
//!
//! The view factory announces what it is doing (`creating: <view>`, `composing: <view>`,
//! `rendered: <view>`) through an [`EventDispatcher`]. Listeners subscribe to an exact event
//! name or to a prefix pattern ending in `*` (`composing: *`).
//!
//! Dispatch is fire-and-forget from the caller's point of view: a failing listener is logged
//! and the remaining listeners still run.
//!
//! ```
//! use std::sync::Arc;
//! use bladebridge_events::{Dispatcher, Event, EventDispatcher};
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.listen("composing: *", Arc::new(|event: &Event| {
//!     println!("about to render {}", event.name);
//!     Ok(())
//! }))?;
//! dispatcher.dispatch(Event::new("composing: welcome", serde_json::json!({})))?;
//! # Ok::<(), bladebridge_events::EventError>(())
//! ```

pub mod dispatcher;
pub mod error;
pub mod types;

pub use dispatcher::{Dispatcher, EventDispatcher};
pub use error::{EventError, Result};
pub use types::{Event, Listener};
