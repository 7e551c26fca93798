//! Process-local transport.
//!
//! A `MemoryGraph` plays the role of a transport domain: nodes created from
//! it share one registry of advertised services, and every advertisement
//! change triggers the graph events of every live node. Useful for tests and
//! for wiring components in a single process.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tether_core::{
    Context, GraphEvent, NodeGraph, NodeHandle, RawClient, ShutdownCallbackId, TransportError,
    WaitResult, WaitTimeout,
};
use tracing::{debug, info};

use crate::config::{GraphConfig, NodeConfig};
use crate::node::Node;

// ---------------------------------------------------------------------------
// Shared graph state
// ---------------------------------------------------------------------------

/// Weakly held graph events of one node.
#[derive(Default)]
struct EventList {
    events: Mutex<Vec<Weak<GraphEvent>>>,
}

impl EventList {
    /// Adds `event`, dropping entries whose event is already gone.
    fn register(&self, event: &Arc<GraphEvent>) {
        let mut events = self.events.lock();
        events.retain(|weak| weak.strong_count() > 0);
        events.push(Arc::downgrade(event));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Sets every live event and forgets dropped ones.
    fn trigger_all(&self) -> usize {
        let mut events = self.events.lock();
        events.retain(|weak| match weak.upgrade() {
            Some(event) => {
                event.set();
                true
            }
            None => false,
        });
        events.len()
    }
}

struct GraphInner {
    config: GraphConfig,
    /// Service name -> number of servers advertising it.
    services: DashMap<String, usize>,
    nodes: Mutex<Vec<Weak<EventList>>>,
    next_node_id: AtomicU64,
    live_clients: AtomicUsize,
}

impl GraphInner {
    fn graph_changed(&self) {
        if !self.config.notify_graph_changes {
            debug!("graph change not signalled");
            return;
        }
        self.trigger_all();
    }

    fn trigger_all(&self) {
        self.nodes.lock().retain(|weak| match weak.upgrade() {
            Some(events) => {
                events.trigger_all();
                true
            }
            None => false,
        });
    }
}

fn validate_service_name(name: &str) -> Result<(), TransportError> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.chars().any(char::is_whitespace) {
        "contains whitespace"
    } else if name.ends_with('/') {
        "must not end with '/'"
    } else if name.contains("//") {
        "contains repeated '/'"
    } else {
        return Ok(());
    };
    Err(TransportError::InvalidServiceName {
        name: name.to_string(),
        reason,
    })
}

// ---------------------------------------------------------------------------
// MemoryGraph
// ---------------------------------------------------------------------------

/// In-process graph of nodes and advertised services.
#[derive(Clone)]
pub struct MemoryGraph {
    inner: Arc<GraphInner>,
}

impl std::fmt::Debug for MemoryGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGraph")
            .field("services", &self.inner.services.len())
            .field("live_clients", &self.live_clients())
            .finish_non_exhaustive()
    }
}

impl MemoryGraph {
    #[must_use]
    pub fn new(config: GraphConfig) -> Self {
        Self {
            inner: Arc::new(GraphInner {
                config,
                services: DashMap::new(),
                nodes: Mutex::new(Vec::new()),
                next_node_id: AtomicU64::new(1),
                live_clients: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates a node resource on this graph.
    #[must_use]
    pub fn node_handle(&self, config: &NodeConfig) -> Arc<MemoryNodeHandle> {
        let id = self.inner.next_node_id.fetch_add(1, Ordering::Relaxed);
        Arc::new(MemoryNodeHandle {
            id,
            name: config.fully_qualified_name(),
            graph: Arc::clone(&self.inner),
            valid: AtomicBool::new(true),
        })
    }

    /// Creates a graph interface whose events wake on graph changes and on
    /// shutdown of `context`.
    #[must_use]
    pub fn node_graph(&self, context: &Arc<Context>) -> Arc<MemoryNodeGraph> {
        let events = Arc::new(EventList::default());
        {
            let mut nodes = self.inner.nodes.lock();
            nodes.retain(|weak| weak.strong_count() > 0);
            nodes.push(Arc::downgrade(&events));
        }

        let on_shutdown = Arc::downgrade(&events);
        let shutdown_callback = context.on_shutdown(move || {
            if let Some(events) = on_shutdown.upgrade() {
                events.trigger_all();
            }
        });

        Arc::new(MemoryNodeGraph {
            events,
            poll_interval: self.inner.config.poll_interval.map(WaitTimeout::from),
            context: Arc::clone(context),
            shutdown_callback,
        })
    }

    /// Creates a complete node (resource plus graph interface).
    #[must_use]
    pub fn create_node(&self, config: NodeConfig, context: Arc<Context>) -> Node {
        let handle = self.node_handle(&config);
        let graph = self.node_graph(&context);
        Node::new(config, handle, graph, context)
    }

    /// Advertises a server for `service_name` until the returned guard drops.
    ///
    /// # Errors
    ///
    /// Returns `InvalidServiceName` if the name is malformed.
    pub fn advertise_service(
        &self,
        service_name: &str,
    ) -> Result<ServiceAdvertisement, TransportError> {
        validate_service_name(service_name)?;
        *self
            .inner
            .services
            .entry(service_name.to_string())
            .or_insert(0) += 1;
        info!(service = service_name, "service advertised");
        self.inner.graph_changed();

        Ok(ServiceAdvertisement {
            graph: Arc::clone(&self.inner),
            service_name: service_name.to_string(),
        })
    }

    /// Number of servers currently advertising `service_name`.
    #[must_use]
    pub fn server_count(&self, service_name: &str) -> usize {
        self.inner
            .services
            .get(service_name)
            .map_or(0, |count| *count)
    }

    /// Number of clients whose transport state is still allocated.
    #[must_use]
    pub fn live_clients(&self) -> usize {
        self.inner.live_clients.load(Ordering::SeqCst)
    }

    /// Triggers every node's graph events, even when automatic notification
    /// is disabled.
    pub fn notify_graph_change(&self) {
        self.inner.trigger_all();
    }

    /// Number of node graph interfaces registered for change notification.
    #[must_use]
    pub fn registered_nodes(&self) -> usize {
        self.inner.nodes.lock().len()
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

// ---------------------------------------------------------------------------
// ServiceAdvertisement
// ---------------------------------------------------------------------------

/// RAII guard for an advertised server. Withdraws it on drop.
pub struct ServiceAdvertisement {
    graph: Arc<GraphInner>,
    service_name: String,
}

impl std::fmt::Debug for ServiceAdvertisement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAdvertisement")
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

impl ServiceAdvertisement {
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for ServiceAdvertisement {
    fn drop(&mut self) {
        self.graph
            .services
            .remove_if_mut(&self.service_name, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            });
        info!(service = %self.service_name, "service withdrawn");
        self.graph.graph_changed();
    }
}

// ---------------------------------------------------------------------------
// Client state
// ---------------------------------------------------------------------------

/// Transport state installed into a `RawClient` by `MemoryNodeHandle`.
struct MemoryClient {
    service_name: String,
    node_id: u64,
    graph: Arc<GraphInner>,
}

impl MemoryClient {
    fn new(service_name: &str, node_id: u64, graph: &Arc<GraphInner>) -> Self {
        graph.live_clients.fetch_add(1, Ordering::SeqCst);
        Self {
            service_name: service_name.to_string(),
            node_id,
            graph: Arc::clone(graph),
        }
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        self.graph.live_clients.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// MemoryNodeHandle
// ---------------------------------------------------------------------------

/// Node resource on a [`MemoryGraph`].
pub struct MemoryNodeHandle {
    id: u64,
    name: String,
    graph: Arc<GraphInner>,
    valid: AtomicBool,
}

impl std::fmt::Debug for MemoryNodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNodeHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}

impl MemoryNodeHandle {
    /// Tears down the node resource. Later queries and finalizations fail.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    fn ensure_valid(&self) -> Result<(), TransportError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(TransportError::NodeInvalid {
                node: self.name.clone(),
            })
        }
    }

    fn client_state<'a>(
        &self,
        client: &'a RawClient,
    ) -> Result<&'a MemoryClient, TransportError> {
        client
            .state::<MemoryClient>()
            .filter(|state| state.node_id == self.id)
            .ok_or(TransportError::ClientInvalid)
    }
}

impl NodeHandle for MemoryNodeHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn client_init(
        &self,
        client: &mut RawClient,
        service_name: &str,
    ) -> Result<(), TransportError> {
        self.ensure_valid()?;
        validate_service_name(service_name)?;
        client.install(MemoryClient::new(service_name, self.id, &self.graph))
    }

    fn client_fini(&self, client: &mut RawClient) -> Result<(), TransportError> {
        if !client.is_initialized() {
            return Ok(());
        }
        self.ensure_valid()?;
        self.client_state(client)?;
        client.take_state::<MemoryClient>();
        Ok(())
    }

    fn service_server_is_available(&self, client: &RawClient) -> Result<bool, TransportError> {
        self.ensure_valid()?;
        let state = self.client_state(client)?;
        Ok(self
            .graph
            .services
            .get(&state.service_name)
            .is_some_and(|count| *count > 0))
    }
}

// ---------------------------------------------------------------------------
// MemoryNodeGraph
// ---------------------------------------------------------------------------

/// Graph interface of one node on a [`MemoryGraph`].
pub struct MemoryNodeGraph {
    events: Arc<EventList>,
    poll_interval: Option<WaitTimeout>,
    context: Arc<Context>,
    shutdown_callback: ShutdownCallbackId,
}

impl std::fmt::Debug for MemoryNodeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNodeGraph")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl NodeGraph for MemoryNodeGraph {
    fn get_graph_event(&self) -> Arc<GraphEvent> {
        let event = Arc::new(GraphEvent::new());
        self.events.register(&event);
        event
    }

    fn wait_for_graph_change(
        &self,
        event: &GraphEvent,
        timeout: WaitTimeout,
    ) -> Result<WaitResult, TransportError> {
        if self.context.is_shutdown_requested() {
            return Ok(event.wait(WaitTimeout::NON_BLOCKING));
        }
        let timeout = match self.poll_interval {
            Some(interval) if timeout.is_infinite() || timeout > interval => interval,
            _ => timeout,
        };
        Ok(event.wait(timeout))
    }
}

impl Drop for MemoryNodeGraph {
    fn drop(&mut self) {
        self.context.remove_on_shutdown(self.shutdown_callback);
    }
}
