//! Reading schema documents and attribute maps from disk

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TreeError};
use crate::merge::AttributeMap;
use crate::normalize::SchemaFormat;

/// Parse a JSON file
pub fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    let value = serde_json::from_str(&content)?;
    debug!(path = %path.display(), bytes = content.len(), "read json document");
    Ok(value)
}

/// Read a schema document, detecting its format unless one is given
pub fn load_document(path: &Path, format: Option<SchemaFormat>) -> Result<(SchemaFormat, Value)> {
    let schema = read_json(path)?;
    let format = match format {
        Some(format) => format,
        None => SchemaFormat::detect(&schema)
            .ok_or_else(|| TreeError::UndetectedFormat(path.display().to_string()))?,
    };
    Ok((format, schema))
}

/// Validate the `{ fqn: { key: value } }` shape of an attribute map
pub fn attribute_map_from_value(value: Value) -> Result<AttributeMap> {
    let Value::Object(entries) = value else {
        return Err(TreeError::InvalidAttributeMap(
            "expected an object keyed by FQN".to_string(),
        ));
    };

    entries
        .into_iter()
        .map(|(fqn, entry)| match entry {
            Value::Object(attributes) => Ok((fqn, attributes)),
            other => Err(TreeError::InvalidAttributeMap(format!(
                "entry for {} must be an object, got {}",
                fqn, other
            ))),
        })
        .collect::<Result<AttributeMap>>()
}

/// Read an attribute map from a JSON file
pub fn load_attribute_map(path: &Path) -> Result<AttributeMap> {
    attribute_map_from_value(read_json(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_json(value: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", value).unwrap();
        file
    }

    #[test]
    fn test_load_document_detects_format() {
        let file = temp_json(&json!({"columns": [{"name": "id", "dataType": "BIGINT"}]}));
        let (format, schema) = load_document(file.path(), None).unwrap();
        assert_eq!(format, SchemaFormat::OpenMetadata);
        assert!(schema["columns"].is_array());
    }

    #[test]
    fn test_load_document_explicit_format_wins() {
        let file = temp_json(&json!({"columns": []}));
        let (format, _) = load_document(file.path(), Some(SchemaFormat::Avro)).unwrap();
        assert_eq!(format, SchemaFormat::Avro);
    }

    #[test]
    fn test_load_document_undetected() {
        let file = temp_json(&json!({"hello": "world"}));
        let err = load_document(file.path(), None).unwrap_err();
        assert!(matches!(err, TreeError::UndetectedFormat(_)));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(read_json(file.path()), Err(TreeError::Json(_))));
        assert!(matches!(
            read_json(Path::new("/definitely/not/here.json")),
            Err(TreeError::Io(_))
        ));
    }

    #[test]
    fn test_attribute_map_shape() {
        let map = attribute_map_from_value(json!({"user_id": {"Source": "DB"}})).unwrap();
        assert_eq!(map["user_id"]["Source"], "DB");
        assert!(!map.contains_key("user"));

        assert!(matches!(
            attribute_map_from_value(json!(["user_id"])),
            Err(TreeError::InvalidAttributeMap(_))
        ));
        assert!(matches!(
            attribute_map_from_value(json!({"user_id": "DB"})),
            Err(TreeError::InvalidAttributeMap(_))
        ));
    }

    #[test]
    fn test_load_attribute_map_file() {
        let file = temp_json(&json!({"address.street": {"Source": "API", "PII": false}}));
        let map = load_attribute_map(file.path()).unwrap();
        assert_eq!(map["address.street"]["PII"], false);
    }
}
