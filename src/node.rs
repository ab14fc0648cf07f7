//! Canonical schema tree
//!
//! Every source format normalizes into [`SchemaNode`]. The fixed canonical
//! properties are typed; anything the merge engine attaches later lives in the
//! open `attributes` bag and is flattened into the same JSON object.
//!
//! A canonical key whose merged value doesn't fit its typed field is kept
//! as-is in `attributes` and shadows the typed field wherever the node is read
//! or serialized.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::ids::NodeId;

/// Canonical JSON keys of a node
pub const KEY_ID: &str = "id";
pub const KEY_NAME: &str = "name";
pub const KEY_DATA_TYPE: &str = "dataType";
pub const KEY_DATA_TYPE_DISPLAY: &str = "dataTypeDisplay";
pub const KEY_CONSTRAINT: &str = "constraint";
pub const KEY_DESCRIPTION: &str = "Description";
pub const KEY_FQN: &str = "fqn";
pub const KEY_CHILDREN: &str = "children";

/// Keys backed by a typed field of [`SchemaNode`]
pub const CANONICAL_KEYS: [&str; 7] = [
    KEY_ID,
    KEY_NAME,
    KEY_DATA_TYPE,
    KEY_DATA_TYPE_DISPLAY,
    KEY_CONSTRAINT,
    KEY_DESCRIPTION,
    KEY_FQN,
];

/// Nullability of a field, encoded as the last `constraint` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nullability {
    #[serde(rename = "NULL")]
    Null,
    #[serde(rename = "NOT_NULL")]
    NotNull,
}

impl Nullability {
    pub fn from_nullable(nullable: bool) -> Self {
        if nullable {
            Self::Null
        } else {
            Self::NotNull
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Nullability::Null => "NULL",
            Nullability::NotNull => "NOT_NULL",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "NULL" => Some(Self::Null),
            "NOT_NULL" => Some(Self::NotNull),
            _ => None,
        }
    }
}

impl fmt::Display for Nullability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a constraint list: the optional source tag, then the nullability tag
pub fn constraint_tags(custom: Option<&str>, nullability: Nullability) -> Vec<String> {
    custom
        .into_iter()
        .map(str::to_string)
        .chain(std::iter::once(nullability.as_str().to_string()))
        .collect()
}

// =============================================================================
// FQN construction
// =============================================================================

/// Suffix marking an array field in both its name and its FQN segment
pub const ARRAY_SUFFIX: &str = "[]";

/// Append `[]` to a field name
pub fn array_name(name: &str) -> String {
    format!("{}{}", name, ARRAY_SUFFIX)
}

/// Wrap a union branch label in brackets
pub fn branch_name(label: &str) -> String {
    format!("[{}]", label)
}

/// FQN of a named child: `parent.name`, or just `name` at the root
pub fn child_fqn(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// FQN of a union branch: `site[label]`
pub fn branch_fqn(site: &str, label: &str) -> String {
    format!("{}[{}]", site, label)
}

// =============================================================================
// Schema node
// =============================================================================

/// One node of the canonical tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct SchemaNode {
    pub id: NodeId,
    pub name: String,
    pub data_type: String,
    pub data_type_display: String,
    pub constraint: Vec<String>,
    pub description: String,
    pub fqn: String,
    pub children: Vec<SchemaNode>,
    /// Extra properties attached by the merge engine
    pub attributes: Map<String, Value>,
}

impl SchemaNode {
    /// Create a leaf node with no description and no attributes
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        data_type: impl Into<String>,
        data_type_display: impl Into<String>,
        constraint: Vec<String>,
        fqn: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            data_type: data_type.into(),
            data_type_display: data_type_display.into(),
            constraint,
            description: String::new(),
            fqn: fqn.into(),
            children: Vec::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_children(mut self, children: Vec<SchemaNode>) -> Self {
        self.children = children;
        self
    }

    /// Nullability recorded in the trailing constraint tag
    pub fn nullability(&self) -> Option<Nullability> {
        self.constraint
            .iter()
            .rev()
            .find_map(|tag| Nullability::from_tag(tag))
    }

    pub fn is_nullable(&self) -> bool {
        self.nullability() == Some(Nullability::Null)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth-first pre-order walk over this node and its descendants
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }

    /// Set a property by its JSON key
    ///
    /// A canonical key overwrites its typed field when the value fits it (a
    /// string, or an array of strings for `constraint`); otherwise the raw value
    /// goes into the attribute bag and shadows the field. Non-canonical keys
    /// always go into the bag. Returns `false` for `children`, which is left
    /// untouched.
    pub fn set_property(&mut self, key: &str, value: &Value) -> bool {
        if key == KEY_CHILDREN {
            return false;
        }
        if !is_canonical(key) || !self.set_typed(key, value) {
            self.attributes.insert(key.to_string(), value.clone());
        } else {
            self.attributes.shift_remove(key);
        }
        true
    }

    fn set_typed(&mut self, key: &str, value: &Value) -> bool {
        if let Value::Array(tags) = value {
            if key != KEY_CONSTRAINT || !tags.iter().all(Value::is_string) {
                return false;
            }
            self.constraint = tags.iter().map(value_text).collect();
            return true;
        }
        let Value::String(text) = value else {
            return false;
        };
        match key {
            KEY_ID => self.id = NodeId::from(text.as_str()),
            KEY_NAME => self.name = text.clone(),
            KEY_DATA_TYPE => self.data_type = text.clone(),
            KEY_DATA_TYPE_DISPLAY => self.data_type_display = text.clone(),
            KEY_DESCRIPTION => self.description = text.clone(),
            KEY_FQN => self.fqn = text.clone(),
            _ => return false,
        }
        true
    }

    /// Look up a property by its JSON key, shadowing attributes first
    pub fn property(&self, key: &str) -> Option<Value> {
        if let Some(raw) = self.attributes.get(key) {
            return Some(raw.clone());
        }
        match key {
            KEY_ID => Some(Value::String(self.id.to_string())),
            KEY_NAME => Some(Value::String(self.name.clone())),
            KEY_DATA_TYPE => Some(Value::String(self.data_type.clone())),
            KEY_DATA_TYPE_DISPLAY => Some(Value::String(self.data_type_display.clone())),
            KEY_CONSTRAINT => Some(Value::from(self.constraint.clone())),
            KEY_DESCRIPTION => Some(Value::String(self.description.clone())),
            KEY_FQN => Some(Value::String(self.fqn.clone())),
            _ => None,
        }
    }

    /// Columns a renderer shows next to the name
    ///
    /// Everything except `id`, `name` and `children`: canonical properties
    /// first, then attributes in the order they were attached.
    pub fn columns(&self) -> Vec<(String, Value)> {
        let canonical = [
            KEY_DATA_TYPE,
            KEY_DATA_TYPE_DISPLAY,
            KEY_CONSTRAINT,
            KEY_DESCRIPTION,
            KEY_FQN,
        ];

        canonical
            .iter()
            .filter_map(|key| self.property(key).map(|value| (key.to_string(), value)))
            .chain(
                self.attributes
                    .iter()
                    .filter(|(key, _)| !is_canonical(key))
                    .map(|(key, value)| (key.clone(), value.clone())),
            )
            .collect()
    }
}

fn is_canonical(key: &str) -> bool {
    CANONICAL_KEYS.contains(&key)
}

fn canonical_entry<M, T>(
    map: &mut M,
    attributes: &Map<String, Value>,
    key: &str,
    typed: &T,
) -> Result<(), M::Error>
where
    M: SerializeMap,
    T: Serialize + ?Sized,
{
    match attributes.get(key) {
        Some(raw) => map.serialize_entry(key, raw),
        None => map.serialize_entry(key, typed),
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let attributes = &self.attributes;
        let mut map = serializer.serialize_map(None)?;
        canonical_entry(&mut map, attributes, KEY_ID, &self.id)?;
        canonical_entry(&mut map, attributes, KEY_NAME, &self.name)?;
        canonical_entry(&mut map, attributes, KEY_DATA_TYPE, &self.data_type)?;
        canonical_entry(&mut map, attributes, KEY_DATA_TYPE_DISPLAY, &self.data_type_display)?;
        canonical_entry(&mut map, attributes, KEY_CONSTRAINT, &self.constraint)?;
        canonical_entry(&mut map, attributes, KEY_DESCRIPTION, &self.description)?;
        canonical_entry(&mut map, attributes, KEY_FQN, &self.fqn)?;
        if !self.children.is_empty() {
            map.serialize_entry(KEY_CHILDREN, &self.children)?;
        }
        for (key, value) in attributes.iter().filter(|(key, _)| !is_canonical(key)) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Rebuild a node from its JSON object the same way the merge engine sets keys
impl TryFrom<Map<String, Value>> for SchemaNode {
    type Error = String;

    fn try_from(mut object: Map<String, Value>) -> Result<Self, Self::Error> {
        let required = [
            KEY_ID,
            KEY_NAME,
            KEY_DATA_TYPE,
            KEY_DATA_TYPE_DISPLAY,
            KEY_CONSTRAINT,
            KEY_FQN,
        ];
        if let Some(missing) = required.iter().find(|key| !object.contains_key(**key)) {
            return Err(format!("missing field `{}`", missing));
        }

        let children = match object.shift_remove(KEY_CHILDREN) {
            None | Some(Value::Null) => Vec::new(),
            Some(children) => serde_json::from_value(children).map_err(|e| e.to_string())?,
        };

        let mut node = SchemaNode::new(NodeId::from(""), "", "", "", Vec::new(), "");
        for (key, value) in &object {
            node.set_property(key, value);
        }
        Ok(node.with_children(children))
    }
}

/// Pre-order iterator over a node and its descendants
pub struct NodeIter<'a> {
    stack: Vec<&'a SchemaNode>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a SchemaNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Walk every node of a forest in pre-order
pub fn walk(tree: &[SchemaNode]) -> impl Iterator<Item = &SchemaNode> {
    tree.iter().flat_map(SchemaNode::iter)
}

/// Find the node with exactly this FQN
pub fn find_by_fqn<'a>(tree: &'a [SchemaNode], fqn: &str) -> Option<&'a SchemaNode> {
    walk(tree).find(|node| node.fqn == fqn)
}

/// FQNs that occur more than once in a tree, in first-seen order
pub fn duplicate_fqns(tree: &[SchemaNode]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for node in walk(tree) {
        if !seen.insert(node.fqn.as_str()) && !duplicates.contains(&node.fqn) {
            duplicates.push(node.fqn.clone());
        }
    }
    duplicates
}

/// Render a JSON value as display text, strings without quotes
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(id: &str, name: &str, fqn: &str) -> SchemaNode {
        SchemaNode::new(
            NodeId::from(id),
            name,
            "string",
            "string",
            constraint_tags(None, Nullability::NotNull),
            fqn,
        )
    }

    #[test]
    fn test_fqn_helpers() {
        assert_eq!(child_fqn("", "user"), "user");
        assert_eq!(child_fqn("orders[]", "id"), "orders[].id");
        assert_eq!(branch_fqn("payload", "LoginEvent"), "payload[LoginEvent]");
        assert_eq!(array_name("tags"), "tags[]");
        assert_eq!(branch_name("string"), "[string]");
    }

    #[test]
    fn test_constraint_tags() {
        assert_eq!(constraint_tags(None, Nullability::Null), vec!["NULL"]);
        assert_eq!(
            constraint_tags(Some("PRIMARY_KEY"), Nullability::NotNull),
            vec!["PRIMARY_KEY", "NOT_NULL"]
        );
    }

    #[test]
    fn test_serialized_shape() {
        let node = leaf("node-7", "street", "address.street").with_description("Street name");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "node-7",
                "name": "street",
                "dataType": "string",
                "dataTypeDisplay": "string",
                "constraint": ["NOT_NULL"],
                "Description": "Street name",
                "fqn": "address.street"
            })
        );
    }

    #[test]
    fn test_attributes_flatten_and_round_trip() {
        let mut node = leaf("node-1", "id", "id");
        node.set_property("Source", &json!("DB"));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["Source"], "DB");

        let back: SchemaNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_set_property_canonical_strings() {
        let mut node = leaf("node-1", "id", "id");
        assert!(node.set_property("Description", &json!("Primary key")));
        assert!(node.set_property("constraint", &json!(["PK", "NULL"])));
        assert!(node.set_property("fqn", &json!("users.id")));
        assert!(node.set_property("id", &json!("custom-1")));
        assert!(!node.set_property("children", &json!([])));

        assert_eq!(node.description, "Primary key");
        assert_eq!(node.nullability(), Some(Nullability::Null));
        assert_eq!(node.fqn, "users.id");
        assert_eq!(node.id.as_str(), "custom-1");
        assert!(node.attributes.is_empty());
    }

    #[test]
    fn test_non_string_canonical_values_keep_their_type() {
        let mut node = leaf("node-1", "id", "id");
        node.set_property("dataType", &json!(7));
        node.set_property("Description", &Value::Null);
        node.set_property("constraint", &json!("PK"));

        assert_eq!(node.data_type, "string");
        assert_eq!(node.property("dataType"), Some(json!(7)));
        assert_eq!(node.property("Description"), Some(Value::Null));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["dataType"], 7);
        assert_eq!(json["Description"], Value::Null);
        assert_eq!(json["constraint"], "PK");
        assert_eq!(json["dataTypeDisplay"], "string");

        let keys: Vec<String> = node.columns().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["dataType", "dataTypeDisplay", "constraint", "Description", "fqn"]
        );
    }

    #[test]
    fn test_string_value_clears_shadowing_attribute() {
        let mut node = leaf("node-1", "id", "id");
        node.set_property("dataType", &json!(7));
        node.set_property("dataType", &json!("int64"));

        assert_eq!(node.data_type, "int64");
        assert!(node.attributes.is_empty());
        assert_eq!(serde_json::to_value(&node).unwrap()["dataType"], "int64");
    }

    #[test]
    fn test_deserialize_requires_canonical_keys() {
        let err = serde_json::from_value::<SchemaNode>(json!({"id": "node-1", "name": "x"}));
        assert!(err.is_err());

        let node: SchemaNode = serde_json::from_value(json!({
            "id": "node-1",
            "name": "x",
            "dataType": 7,
            "dataTypeDisplay": "int",
            "constraint": ["NOT_NULL"],
            "fqn": "x",
            "Owner": "core"
        }))
        .unwrap();
        assert_eq!(node.property("dataType"), Some(json!(7)));
        assert_eq!(node.description, "");
        assert_eq!(node.attributes["Owner"], "core");
    }

    #[test]
    fn test_iter_and_lookup() {
        let tree = vec![
            leaf("node-0", "address", "address").with_children(vec![
                leaf("node-1", "street", "address.street"),
                leaf("node-2", "city", "address.city"),
            ]),
            leaf("node-3", "zip", "zip"),
        ];

        let fqns: Vec<&str> = walk(&tree).map(|n| n.fqn.as_str()).collect();
        assert_eq!(fqns, vec!["address", "address.street", "address.city", "zip"]);
        assert_eq!(find_by_fqn(&tree, "address.city").unwrap().name, "city");
        assert!(find_by_fqn(&tree, "city").is_none());
        assert!(duplicate_fqns(&tree).is_empty());
    }

    #[test]
    fn test_columns_skip_identity() {
        let mut node = leaf("node-1", "id", "id");
        node.set_property("PII", &json!("Yes"));
        let keys: Vec<String> = node.columns().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["dataType", "dataTypeDisplay", "constraint", "Description", "fqn", "PII"]
        );
    }
}
