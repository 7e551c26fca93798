//! Configuration types for nodes and the in-memory transport.

use std::time::Duration;

/// Identity of a node (session).
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Node name, without namespace.
    pub name: String,
    /// Absolute namespace the node lives in.
    pub namespace: String,
}

impl NodeConfig {
    /// Creates a config in the root namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Joins namespace and name into `/ns/name`.
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        let namespace = self.namespace.trim_end_matches('/');
        format!("{namespace}/{}", self.name)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "node".to_string(),
            namespace: "/".to_string(),
        }
    }
}

/// Behavior of an in-memory graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Trigger graph events when services appear or disappear. Disabling this
    /// models transports that add a reachable server without signalling.
    pub notify_graph_changes: bool,
    /// Upper bound on a single graph wait, if any. Models transports whose
    /// wait primitive wakes periodically regardless of events.
    pub poll_interval: Option<Duration>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            notify_graph_changes: true,
            poll_interval: None,
        }
    }
}
