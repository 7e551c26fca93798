//! Nodes: the session that clients are created against.

use std::fmt;
use std::sync::Arc;

use tether_core::{
    Context, GraphEvent, NodeGraph, NodeHandle, TransportError, WaitResult, WaitTimeout,
};
use tracing::info;

use crate::client::ClientBase;
use crate::config::NodeConfig;
use crate::error::ClientError;

/// A named participant in the communication graph.
///
/// Owns the graph interface strongly; clients created from the node only
/// hold it weakly, so dropping the node makes their waits fail with
/// [`ClientError::InvalidNode`]. The node resource itself is shared with
/// every client and outlives the node until the last client is finalized.
pub struct Node {
    config: NodeConfig,
    handle: Arc<dyn NodeHandle>,
    graph: Arc<dyn NodeGraph>,
    context: Arc<Context>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("config", &self.config)
            .field("handle", &self.handle.name())
            .field("context", &self.context.state())
            .finish_non_exhaustive()
    }
}

impl Node {
    pub fn new(
        config: NodeConfig,
        handle: Arc<dyn NodeHandle>,
        graph: Arc<dyn NodeGraph>,
        context: Arc<Context>,
    ) -> Self {
        info!(node = %config.fully_qualified_name(), "node created");
        Self {
            config,
            handle,
            graph,
            context,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        self.config.fully_qualified_name()
    }

    #[must_use]
    pub fn node_handle(&self) -> &Arc<dyn NodeHandle> {
        &self.handle
    }

    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Creates a client for `service_name` on this node.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Initialization`] if the transport rejects the
    /// client.
    pub fn create_client(&self, service_name: &str) -> Result<ClientBase, ClientError> {
        ClientBase::new(
            Arc::clone(&self.handle),
            &self.graph,
            Arc::clone(&self.context),
            service_name,
        )
    }

    /// Allocates a fresh graph change event.
    #[must_use]
    pub fn get_graph_event(&self) -> Arc<GraphEvent> {
        self.graph.get_graph_event()
    }

    /// Blocks until `event` is set or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport's wait primitive fails.
    pub fn wait_for_graph_change(
        &self,
        event: &GraphEvent,
        timeout: WaitTimeout,
    ) -> Result<WaitResult, TransportError> {
        self.graph.wait_for_graph_change(event, timeout)
    }
}
