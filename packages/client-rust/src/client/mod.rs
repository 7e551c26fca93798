//! Service client endpoints.
//!
//! A `ClientBase` is bound to one named service. It owns the raw client
//! handle, answers readiness queries through the node resource, and can
//! block until the service appears (see `wait`).

pub mod handle;
mod wait;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::{Arc, Weak};

use tether_core::{Context, NodeGraph, NodeHandle, RawClient};
use tracing::debug;

use crate::error::ClientError;

pub use handle::ClientHandle;

/// Untyped client endpoint for a single service.
pub struct ClientBase {
    service_name: String,
    handle: ClientHandle,
    node_graph: Weak<dyn NodeGraph>,
    context: Arc<Context>,
}

impl fmt::Debug for ClientBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBase")
            .field("service_name", &self.service_name)
            .field("handle", &self.handle)
            .field("node_alive", &(self.node_graph.strong_count() > 0))
            .finish()
    }
}

impl ClientBase {
    /// Creates a client for `service_name` on the given node.
    ///
    /// The graph interface is held weakly; waits fail with
    /// [`ClientError::InvalidNode`] once it has been dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Initialization`] if the transport rejects the
    /// client.
    pub fn new(
        node_handle: Arc<dyn NodeHandle>,
        node_graph: &Arc<dyn NodeGraph>,
        context: Arc<Context>,
        service_name: &str,
    ) -> Result<Self, ClientError> {
        let mut handle = ClientHandle::zero_initialized(node_handle);
        let node = Arc::clone(handle.node());
        node.client_init(handle.raw_mut(), service_name)
            .map_err(|source| ClientError::Initialization {
                service_name: service_name.to_string(),
                source,
            })?;

        debug!(node = node.name(), service = service_name, "client created");

        Ok(Self {
            service_name: service_name.to_string(),
            handle,
            node_graph: Arc::downgrade(node_graph),
            context,
        })
    }

    /// Name of the service this client talks to.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn client_handle(&self) -> &RawClient {
        self.handle.raw()
    }

    pub fn client_handle_mut(&mut self) -> &mut RawClient {
        self.handle.raw_mut()
    }

    /// The node resource this client was created against.
    #[must_use]
    pub fn node_handle(&self) -> &Arc<dyn NodeHandle> {
        self.handle.node()
    }

    /// The context whose shutdown interrupts waits on this client.
    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Returns `true` if a server for this service is currently reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Query`] if the transport query fails.
    pub fn service_is_ready(&self) -> Result<bool, ClientError> {
        self.handle
            .node()
            .service_server_is_available(self.handle.raw())
            .map_err(|source| ClientError::Query {
                service_name: self.service_name.clone(),
                source,
            })
    }
}
