//! Schema Tree
//!
//! Normalizes Avro, JSON Schema and OpenMetadata schema documents into one
//! canonical, hierarchical tree and overlays externally sourced metadata onto
//! it by fully-qualified name.
//!
//! ## Features
//!
//! - **One Node Shape**: Every format maps onto [`SchemaNode`]
//! - **Stable Addressing**: Each node carries a dotted FQN (`orders[].items[]`)
//! - **Union Branches**: Multi-type fields expose one child per alternative
//! - **Metadata Overlay**: [`merge`] attaches `{ fqn: { key: value } }` maps
//!
//! ## Architecture
//!
//! ```text
//! document (serde_json::Value)
//!     │
//!     ▼
//! SchemaFormat::normalize ──► avro / json_schema / openmetadata
//!     │                          │
//!     │                          └── union::summarize_union, node::child_fqn
//!     ▼
//! Vec<SchemaNode> ──► merge::merge(tree, Some(&attributes)) ──► Vec<SchemaNode>
//! ```
//!
//! ## Example
//!
//! ```
//! use schema_tree::{merge, normalize, AttributeMap, SchemaFormat};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "record",
//!     "name": "User",
//!     "fields": [{"name": "user_id", "type": "long"}]
//! });
//! let tree = normalize(SchemaFormat::Avro, &schema);
//! assert_eq!(tree[0].fqn, "user_id");
//!
//! let attributes: AttributeMap =
//!     serde_json::from_value(json!({"user_id": {"Source": "DB"}})).unwrap();
//! let merged = merge(&tree, Some(&attributes));
//! assert_eq!(merged[0].attributes["Source"], "DB");
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod merge;
pub mod node;
pub mod normalize;
pub mod source;
pub mod union;

pub use config::{OutputFormat, TreeConfig};
pub use error::{Result, TreeError};
pub use ids::{NodeId, NodeIdGenerator};
pub use merge::{merge, AttributeMap, Attributes};
pub use node::{Nullability, SchemaNode};
pub use normalize::{normalize, SchemaFormat};
pub use union::{summarize_union, TypeInfo};
