//! JSON Schema documents
//!
//! Walks `{"type": "object", "properties": {...}}` in declaration order.
//! Plain properties carry their nullability in `nullable: true` or a `type`
//! array containing `"null"`; `oneOf` properties become variant sites whose
//! non-null alternatives expand into `[Branch]` children.
//!
//! Unlike the Avro and OpenMetadata unions, a `oneOf` display string lists
//! each alternative name once.

use serde_json::{Map, Value};
use tracing::debug;

use crate::ids::NodeIdGenerator;
use crate::node::{
    array_name, branch_fqn, branch_name, child_fqn, constraint_tags, Nullability, SchemaNode,
};
use crate::union::{join_distinct, split_nullable, summarize_union, BranchLabels, TypeInfo};

use super::{str_field, value_text, UNKNOWN_TYPE};

fn is_null_type(value: &Value) -> bool {
    value.as_str() == Some("null")
}

fn is_null_variant(alternative: &Value) -> bool {
    str_field(alternative, "type") == Some("null")
}

fn properties_of(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

/// Type named by a schema's `type` keyword alone
fn declared_type(schema: &Value) -> TypeInfo {
    match schema.get("type") {
        Some(Value::String(name)) => TypeInfo::plain(name.as_str()),
        Some(Value::Array(types)) => {
            summarize_union(types, is_null_type, |t| TypeInfo::plain(value_text(t)))
        }
        _ => TypeInfo::plain(UNKNOWN_TYPE),
    }
}

/// `array[<items type>]`, or `array[object]` when items only declare properties
fn array_display(items: Option<&Value>) -> Option<String> {
    let items = items?;
    if items.get("type").is_some() {
        Some(format!("array[{}]", declared_type(items).display))
    } else if properties_of(items).is_some() {
        Some("array[object]".to_string())
    } else {
        None
    }
}

/// Resolve a plain (non-`oneOf`) property
pub(crate) fn parse_property(property: &Value) -> TypeInfo {
    let mut info = declared_type(property);
    if info.data_type == "array" {
        if let Some(display) = array_display(property.get("items")) {
            info.display = display;
        }
    }
    let flagged = property.get("nullable").and_then(Value::as_bool) == Some(true);
    let nullable = info.nullable || flagged;
    info.with_nullable(nullable)
}

/// Name of a `oneOf` alternative: its title, else a name derived from its type
fn variant_label(alternative: &Value) -> String {
    if let Some(title) = str_field(alternative, "title") {
        return title.to_string();
    }
    match str_field(alternative, "type") {
        Some("object") => "object".to_string(),
        Some("array") => {
            array_display(alternative.get("items")).unwrap_or_else(|| "array".to_string())
        }
        Some(other) => other.to_string(),
        None => UNKNOWN_TYPE.to_string(),
    }
}

/// Normalize a JSON Schema object document into a canonical tree
pub fn to_tree(schema: &Value, ids: &NodeIdGenerator) -> Vec<SchemaNode> {
    let Some(properties) = properties_of(schema) else {
        debug!("json schema has no top-level properties, producing an empty tree");
        return Vec::new();
    };

    let normalizer = JsonSchemaNormalizer { ids };
    let tree = normalizer.properties(properties, "");
    debug!(
        title = str_field(schema, "title").unwrap_or("object"),
        properties = tree.len(),
        "normalized json schema"
    );
    tree
}

struct JsonSchemaNormalizer<'a> {
    ids: &'a NodeIdGenerator,
}

impl JsonSchemaNormalizer<'_> {
    fn properties(&self, properties: &Map<String, Value>, parent_fqn: &str) -> Vec<SchemaNode> {
        properties
            .iter()
            .map(|(name, property)| match property.get("oneOf").and_then(Value::as_array) {
                Some(alternatives) => self.variant(name, property, alternatives, parent_fqn),
                None => self.plain(name, property, parent_fqn, false, None),
            })
            .collect()
    }

    /// Children of an object with properties, or of an array whose items have properties
    fn nested(&self, schema: &Value, data_type: &str, fqn: &str) -> Vec<SchemaNode> {
        let properties = match data_type {
            "object" => properties_of(schema),
            "array" => schema.get("items").and_then(properties_of),
            _ => None,
        };
        properties
            .map(|properties| self.properties(properties, fqn))
            .unwrap_or_default()
    }

    fn plain(
        &self,
        name: &str,
        property: &Value,
        parent_fqn: &str,
        nullable: bool,
        description: Option<&str>,
    ) -> SchemaNode {
        let id = self.ids.next_id();
        let info = parse_property(property);
        let name = if info.data_type == "array" {
            array_name(name)
        } else {
            name.to_string()
        };
        let fqn = child_fqn(parent_fqn, &name);
        let children = self.nested(property, &info.data_type, &fqn);
        let description = description
            .or_else(|| str_field(property, "description"))
            .unwrap_or_default();

        SchemaNode::new(
            id,
            name,
            info.data_type,
            info.display,
            constraint_tags(None, Nullability::from_nullable(info.nullable || nullable)),
            fqn,
        )
        .with_description(description)
        .with_children(children)
    }

    fn variant(
        &self,
        name: &str,
        property: &Value,
        alternatives: &[Value],
        parent_fqn: &str,
    ) -> SchemaNode {
        let (nullable, non_null) = split_nullable(alternatives, is_null_variant);

        // A single non-null alternative reads as a plain property of that shape
        if let [single] = non_null.as_slice() {
            return self.plain(
                name,
                single,
                parent_fqn,
                nullable,
                str_field(property, "description"),
            );
        }

        let id = self.ids.next_id();
        let fqn = child_fqn(parent_fqn, name);
        let info = summarize_union(alternatives, is_null_variant, |alternative| {
            TypeInfo::plain(variant_label(alternative))
        });
        let display = if non_null.len() > 1 {
            let labels: Vec<String> = non_null.iter().map(|alt| variant_label(alt)).collect();
            join_distinct(&labels)
        } else {
            info.display
        };

        let mut labels = BranchLabels::new();
        let children = if non_null.len() > 1 {
            non_null
                .iter()
                .map(|alternative| {
                    let label = labels.claim(variant_label(alternative));
                    self.branch(alternative, &label, &fqn)
                })
                .collect()
        } else {
            Vec::new()
        };

        SchemaNode::new(
            id,
            name,
            info.data_type,
            display,
            constraint_tags(None, Nullability::from_nullable(nullable)),
            fqn,
        )
        .with_description(str_field(property, "description").unwrap_or_default())
        .with_children(children)
    }

    fn branch(&self, alternative: &Value, label: &str, site_fqn: &str) -> SchemaNode {
        let id = self.ids.next_id();
        let data_type = str_field(alternative, "type").unwrap_or(UNKNOWN_TYPE);
        let fqn = branch_fqn(site_fqn, label);
        let children = self.nested(alternative, data_type, &fqn);

        SchemaNode::new(
            id,
            branch_name(label),
            data_type,
            variant_label(alternative),
            constraint_tags(None, Nullability::NotNull),
            fqn,
        )
        .with_description(str_field(alternative, "description").unwrap_or_default())
        .with_children(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::duplicate_fqns;
    use serde_json::json;

    fn tree(properties: Value) -> Vec<SchemaNode> {
        let schema = json!({"type": "object", "properties": properties});
        to_tree(&schema, &NodeIdGenerator::new())
    }

    #[test]
    fn test_simple_properties_keep_order() {
        let tree = tree(json!({
            "zeta": {"type": "string", "description": "Last letter"},
            "alpha": {"type": "integer"}
        }));

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "zeta");
        assert_eq!(tree[0].description, "Last letter");
        assert_eq!(tree[0].constraint, vec!["NOT_NULL"]);
        assert_eq!(tree[1].name, "alpha");
        assert_eq!(tree[1].data_type, "integer");
    }

    #[test]
    fn test_array_of_primitives() {
        let tree = tree(json!({"tags": {"type": "array", "items": {"type": "string"}}}));
        assert_eq!(tree[0].name, "tags[]");
        assert_eq!(tree[0].fqn, "tags[]");
        assert_eq!(tree[0].data_type, "array");
        assert_eq!(tree[0].data_type_display, "array[string]");
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_array_of_objects() {
        let tree = tree(json!({
            "orders": {"type": "array", "items": {"properties": {
                "order_id": {"type": "integer"}
            }}}
        }));
        assert_eq!(tree[0].data_type_display, "array[object]");
        assert_eq!(tree[0].children[0].fqn, "orders[].order_id");
    }

    #[test]
    fn test_nested_object() {
        let tree = tree(json!({
            "address": {"type": "object", "properties": {
                "street": {"type": "string"},
                "geo": {"type": "object", "properties": {"lat": {"type": "number"}}}
            }}
        }));
        let address = &tree[0];
        assert_eq!(address.children[0].fqn, "address.street");
        assert_eq!(address.children[1].children[0].fqn, "address.geo.lat");
    }

    #[test]
    fn test_nullability() {
        let tree = tree(json!({
            "flagged": {"type": "string", "nullable": true},
            "typed": {"type": ["string", "null"]},
            "plain": {"type": "string"},
            "mixed": {"type": ["string", "integer", "null"]}
        }));
        assert_eq!(tree[0].constraint, vec!["NULL"]);
        assert_eq!(tree[1].constraint, vec!["NULL"]);
        assert_eq!(tree[1].data_type, "string");
        assert_eq!(tree[2].constraint, vec!["NOT_NULL"]);
        assert_eq!(tree[3].data_type, "union");
        assert_eq!(tree[3].data_type_display, "string | integer");
        assert_eq!(tree[3].constraint, vec!["NULL"]);
    }

    #[test]
    fn test_one_of_branches() {
        let tree = tree(json!({
            "contact": {
                "description": "How to reach the user",
                "oneOf": [
                    {"type": "object", "title": "Email", "properties": {"address": {"type": "string"}}},
                    {"type": "array", "items": {"type": "string"}},
                    {"type": "string"},
                    {"type": "null"}
                ]
            }
        }));

        let contact = &tree[0];
        assert_eq!(contact.data_type, "union");
        assert_eq!(contact.data_type_display, "Email | array[string] | string");
        assert_eq!(contact.constraint, vec!["NULL"]);
        assert_eq!(contact.description, "How to reach the user");
        assert_eq!(contact.children.len(), 3);

        let email = &contact.children[0];
        assert_eq!(email.name, "[Email]");
        assert_eq!(email.data_type, "object");
        assert_eq!(email.constraint, vec!["NOT_NULL"]);
        assert_eq!(email.children[0].fqn, "contact[Email].address");

        assert_eq!(contact.children[1].name, "[array[string]]");
        assert_eq!(contact.children[1].fqn, "contact[array[string]]");
        assert_eq!(contact.children[2].fqn, "contact[string]");
    }

    #[test]
    fn test_one_of_display_collapses_repeats() {
        let tree = tree(json!({
            "shape": {"oneOf": [
                {"type": "object", "properties": {"r": {"type": "number"}}},
                {"type": "object", "properties": {"w": {"type": "number"}}}
            ]}
        }));

        let shape = &tree[0];
        assert_eq!(shape.data_type_display, "object");
        assert_eq!(shape.children.len(), 2);
        assert_eq!(shape.children[0].fqn, "shape[object]");
        assert_eq!(shape.children[1].fqn, "shape[object#2]");
        assert_eq!(shape.children[1].children[0].fqn, "shape[object#2].w");
        assert!(duplicate_fqns(&tree).is_empty());
    }

    #[test]
    fn test_one_of_repeat_does_not_reuse_declared_suffix() {
        let tree = tree(json!({
            "s": {"oneOf": [
                {"type": "object"},
                {"type": "object", "title": "object#2"},
                {"type": "object"}
            ]}
        }));

        let fqns: Vec<&str> = tree[0].children.iter().map(|n| n.fqn.as_str()).collect();
        assert_eq!(fqns, vec!["s[object]", "s[object#2]", "s[object#3]"]);
        assert!(duplicate_fqns(&tree).is_empty());
    }

    #[test]
    fn test_one_of_single_alternative_unwraps() {
        let tree = tree(json!({
            "owner": {"description": "Owning team", "oneOf": [
                {"type": "null"},
                {"type": "object", "properties": {"name": {"type": "string"}}}
            ]}
        }));

        let owner = &tree[0];
        assert_eq!(owner.data_type, "object");
        assert_eq!(owner.constraint, vec!["NULL"]);
        assert_eq!(owner.description, "Owning team");
        assert_eq!(owner.children.len(), 1);
        assert_eq!(owner.children[0].fqn, "owner.name");
    }

    #[test]
    fn test_one_of_only_null() {
        let tree = tree(json!({"nothing": {"oneOf": [{"type": "null"}]}}));
        assert_eq!(tree[0].data_type, "null");
        assert_eq!(tree[0].data_type_display, "null");
        assert_eq!(tree[0].constraint, vec!["NULL"]);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_malformed_input_degrades() {
        assert!(to_tree(&Value::Null, &NodeIdGenerator::new()).is_empty());
        assert!(to_tree(&json!({"type": "object"}), &NodeIdGenerator::new()).is_empty());

        let tree = tree(json!({
            "untyped": {"description": "no type"},
            "bool_schema": true,
            "bare_array": {"type": "array"}
        }));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[0].data_type, "unknown");
        assert_eq!(tree[1].data_type, "unknown");
        assert_eq!(tree[2].name, "bare_array[]");
        assert_eq!(tree[2].data_type_display, "array");
    }
}
