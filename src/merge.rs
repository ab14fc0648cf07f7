//! FQN-keyed attribute overlay
//!
//! Attaches externally sourced metadata to an existing tree. Lookup is by exact
//! FQN string equality; the input tree and the attribute map are never
//! modified, the result is a fresh tree.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::node::SchemaNode;

/// Flat key/value bag attached to one node
pub type Attributes = Map<String, Value>;

/// Attribute bags keyed by FQN
pub type AttributeMap = HashMap<String, Attributes>;

/// Overlay `attributes` onto a copy of `tree`
///
/// Every node whose FQN is a key of the map receives that entry's pairs; entry
/// keys win over same-named properties, including `id` and `fqn`. Values keep
/// their JSON type (see [`SchemaNode::set_property`]). Only `children` is
/// refused. Keys that match no node are ignored. `None` or an empty map yields
/// an identical copy.
pub fn merge(tree: &[SchemaNode], attributes: Option<&AttributeMap>) -> Vec<SchemaNode> {
    let attributes = match attributes {
        Some(attributes) if !attributes.is_empty() => attributes,
        _ => return tree.to_vec(),
    };

    let mut matched = HashSet::with_capacity(attributes.len());
    let merged = merge_nodes(tree, attributes, &mut matched);

    if matched.len() < attributes.len() {
        let mut unmatched: Vec<&str> = attributes
            .keys()
            .map(String::as_str)
            .filter(|fqn| !matched.contains(fqn))
            .collect();
        unmatched.sort_unstable();
        debug!(count = unmatched.len(), ?unmatched, "attribute keys matched no node");
    }
    debug!(matched = matched.len(), "merged attributes into tree");

    merged
}

fn merge_nodes<'a>(
    nodes: &[SchemaNode],
    attributes: &'a AttributeMap,
    matched: &mut HashSet<&'a str>,
) -> Vec<SchemaNode> {
    let mut merged = Vec::with_capacity(nodes.len());

    for node in nodes {
        let mut copy = SchemaNode {
            id: node.id.clone(),
            name: node.name.clone(),
            data_type: node.data_type.clone(),
            data_type_display: node.data_type_display.clone(),
            constraint: node.constraint.clone(),
            description: node.description.clone(),
            fqn: node.fqn.clone(),
            children: merge_nodes(&node.children, attributes, matched),
            attributes: node.attributes.clone(),
        };

        if let Some((fqn, entry)) = attributes.get_key_value(&node.fqn) {
            matched.insert(fqn.as_str());
            for (key, value) in entry {
                if !copy.set_property(key, value) {
                    warn!(fqn = %node.fqn, key = %key, "children cannot be overridden by metadata");
                }
            }
        }

        merged.push(copy);
    }

    merged
}
