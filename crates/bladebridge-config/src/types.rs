//! Core configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BladeConfig {
    /// Directories searched for view sources, in priority order
    #[serde(default)]
    pub view_paths: Vec<PathBuf>,
    /// Directory holding compiled views
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Metadata handed to compiled-template engines
    #[serde(default)]
    pub metadata: ViewMetadata,
    /// Extension registrations applied after the built-in ones
    #[serde(default)]
    pub extensions: Vec<ExtensionMapping>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BladeConfig {
    /// Create a configuration for the given view roots and cache directory
    pub fn new<I, P>(view_paths: I, cache_path: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            view_paths: view_paths.into_iter().map(Into::into).collect(),
            cache_path: cache_path.into(),
            metadata: ViewMetadata::default(),
            extensions: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }

    /// Check the configuration is usable for building a bridge
    pub fn validate(&self) -> Result<()> {
        if self.view_paths.is_empty() {
            return Err(ConfigError::Validation(
                "At least one view path is required".to_string(),
            ));
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Cache path must not be empty".to_string(),
            ));
        }
        for mapping in &self.extensions {
            if mapping.extension.trim_start_matches('.').is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Extension mapping for engine '{}' has an empty extension",
                    mapping.engine
                )));
            }
            if mapping.engine.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Extension '{}' is mapped to an empty engine key",
                    mapping.extension
                )));
            }
        }
        Ok(())
    }
}

impl Default for BladeConfig {
    fn default() -> Self {
        Self {
            view_paths: Vec::new(),
            cache_path: default_cache_path(),
            metadata: ViewMetadata::default(),
            extensions: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bladebridge")
        .join("views")
}

/// An extra extension registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtensionMapping {
    /// File extension, with or without the leading dot
    pub extension: String,
    /// Engine key the extension renders with
    pub engine: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum level: trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values compiled views can read through `this.<field>`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ViewMetadata {
    /// Application name
    #[serde(default)]
    pub app_name: Option<String>,
    /// Base URL of the application
    #[serde(default)]
    pub app_url: Option<String>,
    /// Active locale
    #[serde(default)]
    pub locale: Option<String>,
    /// Anything else
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ViewMetadata {
    /// Shallow merge; values from `other` win on collision
    pub fn merge(&mut self, other: ViewMetadata) {
        if other.app_name.is_some() {
            self.app_name = other.app_name;
        }
        if other.app_url.is_some() {
            self.app_url = other.app_url;
        }
        if other.locale.is_some() {
            self.locale = other.locale;
        }
        self.extra.extend(other.extra);
    }

    /// Look up a field by name, falling back to `extra`
    pub fn field(&self, name: &str) -> Option<serde_json::Value> {
        let named = match name {
            "app_name" => &self.app_name,
            "app_url" => &self.app_url,
            "locale" => &self.locale,
            _ => return self.extra.get(name).cloned(),
        };
        named.clone().map(serde_json::Value::String)
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.app_name.is_none()
            && self.app_url.is_none()
            && self.locale.is_none()
            && self.extra.is_empty()
    }

    /// The metadata as a JSON object
    pub fn to_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for name in ["app_name", "app_url", "locale"] {
            if let Some(value) = self.field(name) {
                map.insert(name.to_string(), value);
            }
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_later_wins() {
        let mut base = ViewMetadata {
            app_name: Some("first".to_string()),
            locale: Some("en".to_string()),
            ..Default::default()
        };
        base.extra.insert("theme".to_string(), json!("light"));

        let mut later = ViewMetadata {
            app_name: Some("second".to_string()),
            ..Default::default()
        };
        later.extra.insert("theme".to_string(), json!("dark"));
        later.extra.insert("year".to_string(), json!(2024));

        base.merge(later);

        assert_eq!(base.app_name.as_deref(), Some("second"));
        assert_eq!(base.locale.as_deref(), Some("en"));
        assert_eq!(base.extra.get("theme"), Some(&json!("dark")));
        assert_eq!(base.extra.get("year"), Some(&json!(2024)));
    }

    #[test]
    fn test_field_lookup() {
        let mut meta = ViewMetadata {
            app_url: Some("https://example.test".to_string()),
            ..Default::default()
        };
        meta.extra.insert("support".to_string(), json!("help@example.test"));

        assert_eq!(meta.field("app_url"), Some(json!("https://example.test")));
        assert_eq!(meta.field("support"), Some(json!("help@example.test")));
        assert_eq!(meta.field("app_name"), None);
        assert_eq!(meta.field("missing"), None);
    }

    #[test]
    fn test_to_value() {
        let mut meta = ViewMetadata {
            app_name: Some("Shop".to_string()),
            ..Default::default()
        };
        meta.extra.insert("currency".to_string(), json!("EUR"));

        assert_eq!(
            meta.to_value(),
            json!({"app_name": "Shop", "currency": "EUR"})
        );
        assert!(ViewMetadata::default().is_empty());
        assert!(!meta.is_empty());
    }

    #[test]
    fn test_validate_requires_view_paths() {
        let config = BladeConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = BladeConfig::new(["views"], "cache");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_mappings() {
        let mut config = BladeConfig::new(["views"], "cache");
        config.extensions.push(ExtensionMapping {
            extension: ".".to_string(),
            engine: "file".to_string(),
        });
        assert!(config.validate().is_err());

        config.extensions[0] = ExtensionMapping {
            extension: "txt".to_string(),
            engine: String::new(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_cache_path() {
        let config = BladeConfig::new(["views"], "");
        assert!(config.validate().is_err());
    }
}
