//! Configuration for the bladebridge view pipeline
//!
//! Holds the construction inputs of the bridge (view roots, compiled-view cache directory,
//! engine metadata, extra extension registrations and logging) and loads them from a TOML
//! file layered under `BLADE_*` environment variables.

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use types::{BladeConfig, ExtensionMapping, LoggingConfig, ViewMetadata};
