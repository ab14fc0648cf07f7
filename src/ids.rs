//! Node identity
//!
//! Ids are opaque rendering keys. They are never part of an FQN and carry no
//! meaning across runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque node identifier, rendered as `node-<n>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Monotonic id source shared by every node built from it
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    next: AtomicU64,
}

static GLOBAL_IDS: NodeIdGenerator = NodeIdGenerator::new();

impl NodeIdGenerator {
    /// Create a generator starting at `node-0`
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Process-wide generator used by the convenience entry points
    pub fn global() -> &'static NodeIdGenerator {
        &GLOBAL_IDS
    }

    /// Hand out the next id
    pub fn next_id(&self) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        NodeId(format!("node-{}", n))
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
