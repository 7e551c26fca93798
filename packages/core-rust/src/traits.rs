use std::sync::Arc;

use crate::error::TransportError;
use crate::event::{GraphEvent, WaitResult};
use crate::handle::RawClient;
use crate::timeout::WaitTimeout;

/// The node resource a transport hands out per session.
///
/// Owns the transport-side lifetime of every client created against it.
/// Clients hold it by `Arc` so their handles are always finalized before the
/// node resource is destroyed.
pub trait NodeHandle: Send + Sync {
    /// Fully qualified node name, used in diagnostics.
    fn name(&self) -> &str;

    /// Returns `false` once the node resource has been torn down.
    fn is_valid(&self) -> bool;

    /// Initializes a zero-initialized client for `service_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot create the client.
    fn client_init(
        &self,
        client: &mut RawClient,
        service_name: &str,
    ) -> Result<(), TransportError>;

    /// Finalizes a client. Finalizing a zero-initialized client succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport could not release the client. The
    /// caller is then responsible for releasing the handle's state.
    fn client_fini(&self, client: &mut RawClient) -> Result<(), TransportError>;

    /// Returns `true` if a server matching the client's service is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the node or the client handle is invalid.
    fn service_server_is_available(&self, client: &RawClient) -> Result<bool, TransportError>;
}

/// Graph queries and change notification for a session.
///
/// Shared across every client of a node; implementations must be
/// thread-safe.
pub trait NodeGraph: Send + Sync {
    /// Allocates a fresh edge-triggered event that is set on every graph
    /// change observed after this call.
    fn get_graph_event(&self) -> Arc<GraphEvent>;

    /// Blocks until `event` is set or `timeout` elapses. A negative timeout
    /// waits until the event is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport's wait primitive fails.
    fn wait_for_graph_change(
        &self,
        event: &GraphEvent,
        timeout: WaitTimeout,
    ) -> Result<WaitResult, TransportError>;
}
