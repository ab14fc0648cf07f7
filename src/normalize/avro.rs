//! Avro record schemas
//!
//! Walks `{"type": "record", "fields": [...]}` and emits one node per field.
//! Unions with two or more non-null alternatives expand into `[Branch]`
//! children; a union with a single non-null alternative is unwrapped and the
//! field behaves as if it had been declared with that type.

use serde_json::Value;
use tracing::{debug, warn};

use crate::ids::NodeIdGenerator;
use crate::node::{
    array_name, branch_fqn, branch_name, child_fqn, constraint_tags, Nullability, SchemaNode,
};
use crate::union::{split_nullable, summarize_union, BranchLabels, TypeInfo};

use super::{str_field, value_text, NULL_VALUE};

/// Shape of an Avro type expression
#[derive(Debug, Clone, Copy)]
enum AvroType<'a> {
    /// `"string"`, `"long"`, or a reference to a named type
    Primitive(&'a str),
    /// `["null", ...]`
    Union(&'a [Value]),
    /// `{"type": "array", "items": ...}`
    Array { items: &'a Value },
    /// `{"type": "record", "name": ..., "fields": [...]}`
    Record {
        name: Option<&'a str>,
        fields: &'a [Value],
        logical_type: Option<&'a str>,
    },
    /// `enum`, `fixed`, `map` or an annotated primitive
    Other {
        type_name: &'a str,
        logical_type: Option<&'a str>,
    },
    /// Anything that doesn't look like an Avro type
    Unknown(&'a Value),
}

impl<'a> AvroType<'a> {
    fn classify(value: &'a Value) -> Self {
        let obj = match value {
            Value::String(s) => return AvroType::Primitive(s),
            Value::Array(alternatives) => return AvroType::Union(alternatives),
            Value::Object(obj) => obj,
            other => return AvroType::Unknown(other),
        };

        let logical_type = obj.get("logicalType").and_then(Value::as_str);
        match obj.get("type").and_then(Value::as_str) {
            Some("array") => AvroType::Array {
                items: obj.get("items").unwrap_or(&NULL_VALUE),
            },
            Some("record") => AvroType::Record {
                name: obj.get("name").and_then(Value::as_str),
                fields: fields_of(value),
                logical_type,
            },
            Some(type_name) => AvroType::Other {
                type_name,
                logical_type,
            },
            None => AvroType::Unknown(value),
        }
    }

    /// Replace a union holding exactly one non-null alternative by that alternative
    fn unwrap_trivial_union(self) -> Self {
        if let AvroType::Union(alternatives) = self {
            let (_, non_null) = split_nullable(alternatives, is_null);
            if let [single] = non_null.as_slice() {
                return AvroType::classify(*single);
            }
        }
        self
    }
}

fn is_null(value: &Value) -> bool {
    value.as_str() == Some("null")
}

fn fields_of(record: &Value) -> &[Value] {
    record
        .get("fields")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Branch label: a named type's name, else its `type`, else the primitive itself
fn branch_label(alternative: &Value) -> String {
    match alternative {
        Value::Object(_) => str_field(alternative, "name")
            .or_else(|| str_field(alternative, "type"))
            .map(str::to_string)
            .unwrap_or_else(|| value_text(alternative)),
        other => value_text(other),
    }
}

fn with_logical_type(display: String, logical_type: Option<&str>) -> String {
    match logical_type {
        Some(logical) => format!("{}:{}", display, logical),
        None => display,
    }
}

/// Resolve the data type, display string and nullability of a type expression
pub(crate) fn parse_type(value: &Value) -> TypeInfo {
    match AvroType::classify(value) {
        AvroType::Primitive(name) => TypeInfo::plain(name),
        AvroType::Union(alternatives) => summarize_union(alternatives, is_null, parse_type),
        AvroType::Array { items } => {
            TypeInfo::new("array", format!("array[{}]", parse_type(items).display))
        }
        AvroType::Record {
            name, logical_type, ..
        } => TypeInfo::new(
            "record",
            with_logical_type(name.unwrap_or("record").to_string(), logical_type),
        ),
        AvroType::Other {
            type_name,
            logical_type,
        } => TypeInfo::new(
            type_name,
            with_logical_type(type_name.to_string(), logical_type),
        ),
        AvroType::Unknown(raw) => TypeInfo::plain(value_text(raw)),
    }
}

/// Normalize an Avro record schema into a canonical tree
pub fn to_tree(schema: &Value, ids: &NodeIdGenerator) -> Vec<SchemaNode> {
    if schema.get("type").and_then(Value::as_str) != Some("record") {
        debug!("avro schema has no top-level record, producing an empty tree");
        return Vec::new();
    }

    let normalizer = AvroNormalizer { ids };
    let tree = normalizer.fields(fields_of(schema), "");
    debug!(
        record = str_field(schema, "name").unwrap_or("record"),
        fields = tree.len(),
        "normalized avro schema"
    );
    tree
}

struct AvroNormalizer<'a> {
    ids: &'a NodeIdGenerator,
}

impl AvroNormalizer<'_> {
    fn fields(&self, fields: &[Value], parent_fqn: &str) -> Vec<SchemaNode> {
        fields
            .iter()
            .map(|field| self.field(field, parent_fqn))
            .collect()
    }

    fn field(&self, field: &Value, parent_fqn: &str) -> SchemaNode {
        let id = self.ids.next_id();
        let declared = field.get("type").unwrap_or(&NULL_VALUE);
        let mut info = parse_type(declared);

        // A logicalType next to a bare primitive type belongs to the field itself
        if declared.is_string() {
            info.display = with_logical_type(info.display, str_field(field, "logicalType"));
        }

        let resolved = AvroType::classify(declared).unwrap_trivial_union();
        let field_name = str_field(field, "name").unwrap_or_else(|| {
            warn!(parent = parent_fqn, "avro field without a name");
            ""
        });
        let name = match resolved {
            AvroType::Array { .. } => array_name(field_name),
            _ => field_name.to_string(),
        };
        let fqn = child_fqn(parent_fqn, &name);
        let children = self.children(resolved, &fqn);

        SchemaNode::new(
            id,
            name,
            info.data_type,
            info.display,
            constraint_tags(
                str_field(field, "constraint"),
                Nullability::from_nullable(info.nullable),
            ),
            fqn,
        )
        .with_description(str_field(field, "doc").unwrap_or_default())
        .with_children(children)
    }

    fn children(&self, resolved: AvroType<'_>, fqn: &str) -> Vec<SchemaNode> {
        match resolved {
            AvroType::Record { fields, .. } => self.fields(fields, fqn),
            AvroType::Array { items } => {
                match AvroType::classify(items).unwrap_trivial_union() {
                    AvroType::Union(alternatives) => self.branches(alternatives, fqn),
                    AvroType::Record { fields, .. } => self.fields(fields, fqn),
                    _ => Vec::new(),
                }
            }
            AvroType::Union(alternatives) => self.branches(alternatives, fqn),
            _ => Vec::new(),
        }
    }

    /// One `[Branch]` child per non-null alternative, only when there are two or more
    fn branches(&self, alternatives: &[Value], site_fqn: &str) -> Vec<SchemaNode> {
        let (_, non_null) = split_nullable(alternatives, is_null);
        if non_null.len() < 2 {
            return Vec::new();
        }
        let mut labels = BranchLabels::new();
        non_null
            .into_iter()
            .map(|alternative| {
                let label = labels.claim(branch_label(alternative));
                self.branch(alternative, &label, site_fqn)
            })
            .collect()
    }

    fn branch(&self, alternative: &Value, label: &str, site_fqn: &str) -> SchemaNode {
        let id = self.ids.next_id();
        let info = parse_type(alternative);
        let fqn = branch_fqn(site_fqn, label);

        let children = match AvroType::classify(alternative) {
            AvroType::Record { fields, .. } => self.fields(fields, &fqn),
            AvroType::Array { items } => match AvroType::classify(items) {
                AvroType::Record { fields, .. } => self.fields(fields, &fqn),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        SchemaNode::new(
            id,
            branch_name(label),
            info.data_type,
            info.display,
            constraint_tags(None, Nullability::NotNull),
            fqn,
        )
        .with_description(str_field(alternative, "doc").unwrap_or_default())
        .with_children(children)
    }
}
