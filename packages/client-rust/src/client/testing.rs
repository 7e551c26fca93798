//! Scripted transport doubles for client tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tether_core::{
    GraphEvent, NodeGraph, NodeHandle, RawClient, TransportError, WaitResult, WaitTimeout,
};

/// Client state installed by `ScriptedNode`; counts live instances.
struct Lease(Arc<AtomicUsize>);

impl Lease {
    fn new(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(live))
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Node resource whose readiness and failures are driven by the test.
#[derive(Default)]
pub(crate) struct ScriptedNode {
    ready: AtomicBool,
    /// When non-zero, the service reports ready from this query number on.
    pub ready_from_query: AtomicUsize,
    pub fail_init: AtomicBool,
    pub fail_query: AtomicBool,
    pub fail_fini: AtomicBool,
    pub query_calls: AtomicUsize,
    pub fini_calls: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of client states currently attached to handles.
    pub fn live_clients(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl NodeHandle for ScriptedNode {
    fn name(&self) -> &str {
        "/scripted"
    }

    fn is_valid(&self) -> bool {
        !self.fail_query.load(Ordering::SeqCst)
    }

    fn client_init(
        &self,
        client: &mut RawClient,
        _service_name: &str,
    ) -> Result<(), TransportError> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("scripted init failure").into());
        }
        client.install(Lease::new(&self.live))
    }

    fn client_fini(&self, client: &mut RawClient) -> Result<(), TransportError> {
        self.fini_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fini.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("scripted fini failure").into());
        }
        client.take_state::<Lease>();
        Ok(())
    }

    fn service_server_is_available(&self, client: &RawClient) -> Result<bool, TransportError> {
        let call = self.query_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(TransportError::NodeInvalid {
                node: self.name().to_string(),
            });
        }
        if !client.is_initialized() {
            return Err(TransportError::ClientInvalid);
        }
        let threshold = self.ready_from_query.load(Ordering::SeqCst);
        let ready = self.ready.load(Ordering::SeqCst) || (threshold != 0 && call >= threshold);
        Ok(ready)
    }
}

/// Graph interface that records every wait and optionally caps each one.
#[derive(Default)]
pub(crate) struct ScriptedGraph {
    slice: Option<Duration>,
    pub fail_wait: AtomicBool,
    events: Mutex<Vec<Arc<GraphEvent>>>,
    waits: Mutex<Vec<WaitTimeout>>,
}

impl ScriptedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait returns after at most `slice`, like a transport that wakes
    /// periodically.
    pub fn with_slice(slice: Duration) -> Self {
        Self {
            slice: Some(slice),
            ..Self::default()
        }
    }

    pub fn events_created(&self) -> usize {
        self.events.lock().len()
    }

    pub fn wait_calls(&self) -> usize {
        self.waits.lock().len()
    }

    pub fn waits(&self) -> Vec<WaitTimeout> {
        self.waits.lock().clone()
    }

    pub fn trigger_all(&self) {
        for event in self.events.lock().iter() {
            event.set();
        }
    }
}

impl NodeGraph for ScriptedGraph {
    fn get_graph_event(&self) -> Arc<GraphEvent> {
        let event = Arc::new(GraphEvent::new());
        self.events.lock().push(Arc::clone(&event));
        event
    }

    fn wait_for_graph_change(
        &self,
        event: &GraphEvent,
        timeout: WaitTimeout,
    ) -> Result<WaitResult, TransportError> {
        self.waits.lock().push(timeout);
        if self.fail_wait.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("scripted wait failure").into());
        }
        let effective = match self.slice {
            Some(slice) if timeout.is_infinite() || timeout > WaitTimeout::from(slice) => {
                WaitTimeout::from(slice)
            }
            _ => timeout,
        };
        Ok(event.wait(effective))
    }
}
