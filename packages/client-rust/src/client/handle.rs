//! Scoped ownership of a raw client handle.

use std::fmt;
use std::sync::Arc;

use tether_core::{NodeHandle, RawClient};
use tracing::error;

/// Owns a [`RawClient`] and finalizes it against its node on drop.
///
/// Holding the node by `Arc` keeps the node resource alive until the client
/// has been finalized.
pub struct ClientHandle {
    raw: RawClient,
    node: Arc<dyn NodeHandle>,
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("node", &self.node.name())
            .field("raw", &self.raw)
            .finish()
    }
}

impl ClientHandle {
    /// Wraps a zero-initialized handle bound to `node`.
    #[must_use]
    pub fn zero_initialized(node: Arc<dyn NodeHandle>) -> Self {
        Self {
            raw: RawClient::zero_initialized(),
            node,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &RawClient {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut RawClient {
        &mut self.raw
    }

    #[must_use]
    pub fn node(&self) -> &Arc<dyn NodeHandle> {
        &self.node
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        if let Err(err) = self.node.client_fini(&mut self.raw) {
            error!(
                node = self.node.name(),
                error = %err,
                "error in destruction of client handle"
            );
            self.raw.release();
        }
    }
}
