//! Configuration management for schema-tree
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-tree.toml)
//! - Environment variables (SCHEMA_TREE__*)
//!
//! ## Example config file (schema-tree.toml):
//! ```toml
//! [input]
//! default_format = "avro"
//!
//! [output]
//! format = "compact"
//!
//! [merge]
//! metadata = "metadata/field-owners.json"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::normalize::SchemaFormat;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Input settings
    #[serde(default)]
    pub input: InputConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Merge settings
    #[serde(default)]
    pub merge: MergeConfig,
}

/// Input configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Format to assume instead of detecting it from the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_format: Option<SchemaFormat>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON layout of the emitted tree
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    /// Serialize a value in this layout
    pub fn to_string<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

/// Merge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Attribute map merged into every tree unless overridden on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PathBuf>,
}

impl TreeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-tree.toml",
            ".schema-tree.toml",
            "config/schema-tree.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "schema-tree", "schema-tree") {
            let xdg_config = config_dir.config_dir().join("schema-tree.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SCHEMA_TREE__OUTPUT__FORMAT=compact
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_TREE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
