//! Error types for schema loading and configuration
//!
//! Normalization and merging never fail; only the edges that touch files,
//! parse JSON or pick a format return these.

use thiserror::Error;

/// Result type for schema-tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Schema-tree errors
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Unknown schema format: {0} (expected avro, json-schema or openmetadata)")]
    UnknownFormat(String),

    #[error("Could not detect the schema format of {0}")]
    UndetectedFormat(String),

    #[error("Invalid attribute map: {0}")]
    InvalidAttributeMap(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
