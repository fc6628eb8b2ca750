//! Configuration loading from file and environment

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::{
    error::Result,
    types::BladeConfig,
};

/// Loads `BladeConfig` from an optional TOML file layered under environment variables
pub struct ConfigLoader {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a loader reading the default config file and `BLADE_*` variables
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: "BLADE".to_string(),
        }
    }

    /// Create with custom config path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: "BLADE".to_string(),
        }
    }

    /// Use a different environment prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Path of the configuration file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get default config path
    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bladebridge")
            .join("config.toml")
    }

    /// Load and validate the configuration
    ///
    /// The file is optional; environment variables override it. Nested keys use `__`
    /// (`BLADE_LOGGING__LEVEL`) and `BLADE_VIEW_PATHS` takes a comma separated list.
    pub fn load(&self) -> Result<BladeConfig> {
        debug!(path = %self.config_path.display(), prefix = %self.env_prefix, "Loading configuration");

        let builder = Config::builder()
            .add_source(
                File::from(self.config_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("view_paths")
                    .try_parsing(true),
            );

        let config: BladeConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories
    pub fn save(&self, config: &BladeConfig) -> Result<()> {
        let toml = toml::to_string(config)?;
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.config_path, toml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
