//! OpenMetadata table schemas
//!
//! Walks `{"columns": [...]}`. Nesting is expressed with `STRUCT`, `ARRAY`
//! (plus `arrayDataType`) and `UNION` columns whose members sit in
//! `children`. Anonymous structs are named `STRUCT_<n>` from a counter that
//! restarts with every call to [`to_tree`].

use serde_json::Value;
use tracing::debug;

use crate::ids::NodeIdGenerator;
use crate::node::{
    array_name, branch_fqn, branch_name, child_fqn, constraint_tags, Nullability, SchemaNode,
};
use crate::union::{split_nullable, summarize_union, BranchLabels, TypeInfo};

use super::{str_field, UNKNOWN_TYPE};

/// Column category, from its `dataType` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind<'a> {
    Struct,
    Array,
    Union,
    Null,
    Primitive(&'a str),
}

impl<'a> ColumnKind<'a> {
    fn of(column: &'a Value) -> Self {
        match data_type(column) {
            "STRUCT" => ColumnKind::Struct,
            "ARRAY" => ColumnKind::Array,
            "UNION" => ColumnKind::Union,
            "NULL" => ColumnKind::Null,
            other => ColumnKind::Primitive(other),
        }
    }
}

fn data_type(column: &Value) -> &str {
    str_field(column, "dataType").unwrap_or(UNKNOWN_TYPE)
}

fn is_null_column(column: &Value) -> bool {
    ColumnKind::of(column) == ColumnKind::Null
}

fn children_of(column: &Value) -> &[Value] {
    column
        .get("children")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// `ARRAY[<arrayDataType>]`
fn array_display(column: &Value) -> String {
    format!(
        "ARRAY[{}]",
        str_field(column, "arrayDataType").unwrap_or(UNKNOWN_TYPE)
    )
}

/// Name shown for a union member in its parent's display string
fn member_display(column: &Value) -> String {
    match str_field(column, "name") {
        Some(name) => name.to_string(),
        None if ColumnKind::of(column) == ColumnKind::Array => array_display(column),
        None => data_type(column).to_string(),
    }
}

/// Nullable when flagged, or when a union holds a `NULL` member
fn is_nullable(column: &Value) -> bool {
    let flagged = column.get("nullable").and_then(Value::as_bool).unwrap_or(false);
    let null_member = ColumnKind::of(column) == ColumnKind::Union
        && children_of(column).iter().any(is_null_column);
    flagged || null_member
}

/// The only non-null member of a union column, if it has exactly one
fn sole_member(column: &Value) -> Option<&Value> {
    if ColumnKind::of(column) != ColumnKind::Union {
        return None;
    }
    match split_nullable(children_of(column), is_null_column).1.as_slice() {
        [single] => Some(*single),
        _ => None,
    }
}

/// Normalize an OpenMetadata table schema into a canonical tree
pub fn to_tree(schema: &Value, ids: &NodeIdGenerator) -> Vec<SchemaNode> {
    let Some(columns) = schema.get("columns").and_then(Value::as_array) else {
        debug!("openmetadata schema has no columns, producing an empty tree");
        return Vec::new();
    };

    let mut normalizer = OpenMetadataNormalizer {
        ids,
        struct_counter: 0,
    };
    let tree = normalizer.columns(columns, "");
    debug!(
        table = str_field(schema, "name").unwrap_or("table"),
        columns = tree.len(),
        anonymous_structs = normalizer.struct_counter,
        "normalized openmetadata schema"
    );
    tree
}

struct OpenMetadataNormalizer<'a> {
    ids: &'a NodeIdGenerator,
    struct_counter: usize,
}

impl OpenMetadataNormalizer<'_> {
    fn next_struct_name(&mut self) -> String {
        self.struct_counter += 1;
        format!("STRUCT_{}", self.struct_counter)
    }

    fn columns(&mut self, columns: &[Value], parent_fqn: &str) -> Vec<SchemaNode> {
        // Unnamed siblings fall back to their type, so names are claimed per parent
        let mut labels = BranchLabels::new();
        columns
            .iter()
            .map(|column| self.column(column, parent_fqn, &mut labels))
            .collect()
    }

    fn column(&mut self, column: &Value, parent_fqn: &str, labels: &mut BranchLabels) -> SchemaNode {
        // A union with one non-null member is named after that member's shape
        let shape = sole_member(column).unwrap_or(column);
        let declared = str_field(column, "name");
        let name = match ColumnKind::of(shape) {
            ColumnKind::Struct => labels.claim(
                declared
                    .map(str::to_string)
                    .unwrap_or_else(|| self.next_struct_name()),
            ),
            ColumnKind::Array => {
                array_name(&labels.claim(declared.unwrap_or_else(|| data_type(shape)).to_string()))
            }
            _ => labels.claim(declared.unwrap_or_else(|| data_type(column)).to_string()),
        };
        let fqn = child_fqn(parent_fqn, &name);
        let constraint = constraint_tags(
            str_field(column, "constraint"),
            Nullability::from_nullable(is_nullable(column)),
        );
        let description = str_field(column, "description").unwrap_or_default();

        self.node(column, name, fqn, constraint, description)
    }

    fn node(
        &mut self,
        column: &Value,
        name: String,
        fqn: String,
        constraint: Vec<String>,
        description: &str,
    ) -> SchemaNode {
        if let Some(member) = sole_member(column) {
            return self.node(member, name, fqn, constraint, description);
        }

        let id = self.ids.next_id();
        let tag = data_type(column).to_string();

        let (display, children) = match ColumnKind::of(column) {
            ColumnKind::Struct => (tag.clone(), self.columns(children_of(column), &fqn)),
            ColumnKind::Array => {
                let children = if str_field(column, "arrayDataType") == Some("STRUCT") {
                    self.columns(children_of(column), &fqn)
                } else {
                    Vec::new()
                };
                (array_display(column), children)
            }
            ColumnKind::Union => {
                let members = children_of(column);
                let info = summarize_union(members, is_null_column, |member| {
                    TypeInfo::plain(member_display(member))
                });
                let (_, non_null) = split_nullable(members, is_null_column);
                let mut labels = BranchLabels::new();
                let branches: Vec<SchemaNode> = non_null
                    .iter()
                    .map(|member| self.branch(member, &mut labels, &fqn))
                    .collect();
                (info.display, branches)
            }
            ColumnKind::Null | ColumnKind::Primitive(_) => (tag.clone(), Vec::new()),
        };

        SchemaNode::new(id, name, tag, display, constraint, fqn)
            .with_description(description)
            .with_children(children)
    }

    /// A union member as a `[Label]` child
    fn branch(&mut self, member: &Value, labels: &mut BranchLabels, site_fqn: &str) -> SchemaNode {
        let label = match str_field(member, "name") {
            Some(name) => name.to_string(),
            None => match ColumnKind::of(member) {
                ColumnKind::Struct => self.next_struct_name(),
                ColumnKind::Array => array_display(member),
                _ => data_type(member).to_string(),
            },
        };
        let label = labels.claim(label);

        self.node(
            member,
            branch_name(&label),
            branch_fqn(site_fqn, &label),
            constraint_tags(None, Nullability::NotNull),
            str_field(member, "description").unwrap_or_default(),
        )
    }
}
