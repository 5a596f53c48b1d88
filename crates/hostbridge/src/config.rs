//! Extension configuration (`extension.toml`)

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read extension config: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse extension config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid extension config: {0}")]
    Validation(String),
}

/// Order in which `Extension::startup` initializes classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationOrder {
    /// Parents and interfaces before the classes that use them
    #[default]
    Dependency,
    /// Exactly as registered; misordered classes lose their parent
    Declaration,
}

/// Extension configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtensionConfig {
    /// Extension name
    pub name: String,

    /// Extension version (default: "0.1.0")
    #[serde(default = "default_version")]
    pub version: String,

    /// Class initialization order
    #[serde(default)]
    pub registration_order: RegistrationOrder,

    /// Emit a debug record per registered class
    #[serde(default = "default_true")]
    pub log_registration: bool,

    /// Fail startup when a class was registered without its parent or an
    /// interface
    #[serde(default)]
    pub strict_hierarchy: bool,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            name: "extension".to_string(),
            version: default_version(),
            registration_order: RegistrationOrder::default(),
            log_registration: true,
            strict_hierarchy: false,
        }
    }
}

impl ExtensionConfig {
    /// Configuration with defaults for everything but the identity
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Check field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation("Extension name cannot be empty".to_string()));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "Invalid extension name: {}. Must contain only alphanumeric characters, hyphens and underscores",
                self.name
            )));
        }
        if self.version.is_empty() {
            return Err(ConfigError::Validation("Extension version cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl FromStr for ExtensionConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: ExtensionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: ExtensionConfig = "name = \"dummyext\"".parse().unwrap();
        assert_eq!(config.name, "dummyext");
        assert_eq!(config.version, "0.1.0");
        assert_eq!(config.registration_order, RegistrationOrder::Dependency);
        assert!(config.log_registration);
        assert!(!config.strict_hierarchy);
    }

    #[test]
    fn test_parse_full_config() {
        let config: ExtensionConfig = r#"
            name = "geometry"
            version = "1.0"
            registration_order = "declaration"
            log_registration = false
            strict_hierarchy = true
        "#
        .parse()
        .unwrap();
        assert_eq!(config.registration_order, RegistrationOrder::Declaration);
        assert!(!config.log_registration);
        assert!(config.strict_hierarchy);
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let err = "name = \"bad name\"".parse::<ExtensionConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = "name = \"\"".parse::<ExtensionConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = "name = ".parse::<ExtensionConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtensionConfig::new("dummyext", "1.0");
        let text = config.to_toml().unwrap();
        assert_eq!(text.parse::<ExtensionConfig>().unwrap(), config);
    }
}
