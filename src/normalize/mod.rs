//! Source format normalizers
//!
//! One normalizer per source format. Each is a pure function of the parsed
//! document plus the id generator it draws node ids from; none of them fail.
//! Shapes they don't understand degrade to best-effort leaves, and a document
//! without the expected root yields an empty tree.

pub mod avro;
pub mod json_schema;
pub mod openmetadata;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::TreeError;
use crate::ids::NodeIdGenerator;
use crate::node::SchemaNode;

pub(crate) use crate::node::value_text;

/// Data type used when a property or column declares no usable type
pub const UNKNOWN_TYPE: &str = "unknown";

pub(crate) static NULL_VALUE: Value = Value::Null;

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaFormat {
    /// Avro record schemas (`.avsc`)
    Avro,
    /// JSON Schema object documents
    JsonSchema,
    /// OpenMetadata table schemas (`columns`)
    #[serde(rename = "openmetadata")]
    OpenMetadata,
}

impl SchemaFormat {
    pub const ALL: [SchemaFormat; 3] = [
        SchemaFormat::Avro,
        SchemaFormat::JsonSchema,
        SchemaFormat::OpenMetadata,
    ];

    /// Canonical name, as accepted by [`FromStr`] and used in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFormat::Avro => "avro",
            SchemaFormat::JsonSchema => "json-schema",
            SchemaFormat::OpenMetadata => "openmetadata",
        }
    }

    /// Guess the format from the document's root keys
    pub fn detect(schema: &Value) -> Option<Self> {
        if schema.get("type").and_then(Value::as_str) == Some("record") {
            Some(SchemaFormat::Avro)
        } else if schema.get("columns").map(Value::is_array).unwrap_or(false) {
            Some(SchemaFormat::OpenMetadata)
        } else if schema.get("properties").map(Value::is_object).unwrap_or(false)
            || schema.get("type").and_then(Value::as_str) == Some("object")
        {
            Some(SchemaFormat::JsonSchema)
        } else {
            None
        }
    }

    /// Normalize a document of this format into a canonical tree
    pub fn normalize(&self, schema: &Value, ids: &NodeIdGenerator) -> Vec<SchemaNode> {
        match self {
            SchemaFormat::Avro => avro::to_tree(schema, ids),
            SchemaFormat::JsonSchema => json_schema::to_tree(schema, ids),
            SchemaFormat::OpenMetadata => openmetadata::to_tree(schema, ids),
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaFormat {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avro" | "avsc" => Ok(SchemaFormat::Avro),
            "json-schema" | "jsonschema" | "json_schema" | "json" => Ok(SchemaFormat::JsonSchema),
            "openmetadata" | "open-metadata" | "om" => Ok(SchemaFormat::OpenMetadata),
            _ => Err(TreeError::UnknownFormat(s.to_string())),
        }
    }
}

/// Normalize with the process-wide id generator
pub fn normalize(format: SchemaFormat, schema: &Value) -> Vec<SchemaNode> {
    format.normalize(schema, NodeIdGenerator::global())
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            SchemaFormat::detect(&json!({"type": "record", "fields": []})),
            Some(SchemaFormat::Avro)
        );
        assert_eq!(
            SchemaFormat::detect(&json!({"type": "object", "properties": {}})),
            Some(SchemaFormat::JsonSchema)
        );
        assert_eq!(
            SchemaFormat::detect(&json!({"name": "orders", "columns": []})),
            Some(SchemaFormat::OpenMetadata)
        );
        assert_eq!(SchemaFormat::detect(&json!({"type": "enum"})), None);
        assert_eq!(SchemaFormat::detect(&Value::Null), None);
    }

    #[test]
    fn test_parse_format_names() {
        assert_eq!("avro".parse::<SchemaFormat>().unwrap(), SchemaFormat::Avro);
        assert_eq!("JSON-Schema".parse::<SchemaFormat>().unwrap(), SchemaFormat::JsonSchema);
        assert_eq!("om".parse::<SchemaFormat>().unwrap(), SchemaFormat::OpenMetadata);
        assert!(matches!(
            "protobuf".parse::<SchemaFormat>(),
            Err(TreeError::UnknownFormat(name)) if name == "protobuf"
        ));

        for format in SchemaFormat::ALL {
            assert_eq!(format.as_str().parse::<SchemaFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_serde_names_match_display() {
        for format in SchemaFormat::ALL {
            let json = serde_json::to_value(format).unwrap();
            assert_eq!(json, Value::String(format.to_string()));
        }
    }

    #[test]
    fn test_null_document_is_empty_for_every_format() {
        let ids = NodeIdGenerator::new();
        for format in SchemaFormat::ALL {
            assert!(format.normalize(&Value::Null, &ids).is_empty());
            assert!(format.normalize(&json!({}), &ids).is_empty());
        }
        assert_eq!(ids.issued(), 0);
    }
}
