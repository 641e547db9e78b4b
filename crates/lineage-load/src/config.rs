//! Loader configuration.
//!
//! ```yaml
//! module_identity: github.com/grafana/grafana
//! source_extensions: [cue]
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use lineage_core::{ModuleDescriptor, DEFAULT_MODULE_IDENTITY};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings shared by the overlay builder and the instance loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Identity the synthetic module descriptor declares.
    pub module_identity: String,
    /// Extensions (without the dot) of files treated as schema sources.
    pub source_extensions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            module_identity: DEFAULT_MODULE_IDENTITY.to_string(),
            source_extensions: vec!["cue".to_string()],
        }
    }
}

impl LoaderConfig {
    /// Parse and validate a YAML configuration document.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LoaderConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.module_identity.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "module_identity",
                reason: "must not be empty".to_string(),
            });
        }
        if self.module_identity.contains('"') {
            return Err(ConfigError::Invalid {
                field: "module_identity",
                reason: "must not contain quotes".to_string(),
            });
        }
        if self.source_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "source_extensions",
                reason: "at least one extension is required".to_string(),
            });
        }
        if let Some(bad) = self
            .source_extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.contains('.') || ext.contains('/'))
        {
            return Err(ConfigError::Invalid {
                field: "source_extensions",
                reason: format!("{bad:?} is not a bare extension"),
            });
        }
        Ok(())
    }

    /// The descriptor this configuration synthesizes.
    pub fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(&self.module_identity)
    }

    /// Returns true if `ext` is a configured source extension.
    pub fn is_source_extension(&self, ext: &str) -> bool {
        self.source_extensions.iter().any(|e| e == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.module_identity, "github.com/grafana/grafana");
        assert!(config.is_source_extension("cue"));
        assert!(!config.is_source_extension("json"));
        config.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = LoaderConfig::from_yaml_str("source_extensions: [cue, yaml]").unwrap();
        assert_eq!(config.module_identity, DEFAULT_MODULE_IDENTITY);
        assert!(config.is_source_extension("yaml"));
    }

    #[test]
    fn empty_mapping_is_default() {
        let config = LoaderConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, LoaderConfig::default());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = LoaderConfig::from_yaml_str("module: x").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_extensions() {
        let err = LoaderConfig::from_yaml_str("source_extensions: []").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "source_extensions",
                ..
            }
        ));
    }

    #[test]
    fn rejects_dotted_extension() {
        assert!(LoaderConfig::from_yaml_str("source_extensions: [.cue]").is_err());
    }

    #[test]
    fn descriptor_uses_identity() {
        let config = LoaderConfig::from_yaml_str("module_identity: example.com/kinds").unwrap();
        assert_eq!(config.descriptor().identity(), "example.com/kinds");
    }
}
