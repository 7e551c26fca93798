//! Blocking wait for a service to become available.
//!
//! The wait combines two signals:
//! - an edge-triggered graph event, which says "something changed"
//! - a level-triggered readiness query, which says "the server is there"
//!
//! Readiness is re-checked after every wakeup, whether or not the event
//! fired. Some transports make a server reachable without signalling the
//! graph event, so waiting on the event alone can hang.

use std::time::Instant;

use tether_core::WaitTimeout;
use tracing::{debug, trace};

use super::ClientBase;
use crate::error::ClientError;

impl ClientBase {
    /// Waits until the service is ready, `timeout` elapses, or the client's
    /// context shuts down.
    ///
    /// Accepts anything convertible to [`WaitTimeout`], e.g. a `Duration`,
    /// `WaitTimeout::NON_BLOCKING` or `WaitTimeout::INFINITE`.
    ///
    /// # Errors
    ///
    /// See [`ClientBase::wait_for_service_nanoseconds`].
    pub fn wait_for_service(&self, timeout: impl Into<WaitTimeout>) -> Result<bool, ClientError> {
        self.wait_for_service_nanoseconds(timeout.into())
    }

    /// Waits until the service is ready.
    ///
    /// A zero timeout checks once without blocking. A negative timeout waits
    /// until the service appears or shutdown is requested. Returns
    /// `Ok(false)` when the timeout is exhausted or shutdown interrupts the
    /// wait.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidNode`] if the node this client belongs to has
    ///   been dropped.
    /// - [`ClientError::Query`] if a readiness query or the graph wait fails.
    pub fn wait_for_service_nanoseconds(&self, timeout: WaitTimeout) -> Result<bool, ClientError> {
        let start = Instant::now();
        let node = self.node_graph.upgrade().ok_or(ClientError::InvalidNode)?;
        let event = node.get_graph_event();

        if self.service_is_ready()? {
            return Ok(true);
        }
        if timeout.is_non_blocking() {
            return Ok(false);
        }

        // Account for the time spent in the first readiness query.
        let mut time_to_wait = timeout.remaining_after(start.elapsed());
        if timeout.is_bounded() && time_to_wait.as_nanos() < 0 {
            // One more zero-length wait and check still happens.
            time_to_wait = WaitTimeout::NON_BLOCKING;
        }

        loop {
            if self.context.is_shutdown_requested() {
                debug!(service = %self.service_name, "wait for service interrupted by shutdown");
                return Ok(false);
            }

            let result = node.wait_for_graph_change(&event, time_to_wait);
            event.check_and_clear();
            let result = result.map_err(|source| ClientError::Query {
                service_name: self.service_name.clone(),
                source,
            })?;
            trace!(service = %self.service_name, ?result, %time_to_wait, "graph wait returned");

            if self.service_is_ready()? {
                return Ok(true);
            }

            time_to_wait = timeout.remaining_after(start.elapsed());
            if !(time_to_wait.is_bounded() || timeout.is_infinite()) {
                break;
            }
        }

        debug!(service = %self.service_name, %timeout, "timed out waiting for service");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use proptest::prelude::*;
    use tether_core::{Context, NodeGraph, NodeHandle, TransportError};

    use super::super::testing::{ScriptedGraph, ScriptedNode};
    use super::*;

    struct Fixture {
        node: Arc<ScriptedNode>,
        graph: Arc<ScriptedGraph>,
        context: Arc<Context>,
        client: ClientBase,
    }

    fn fixture(graph: ScriptedGraph) -> Fixture {
        let node = Arc::new(ScriptedNode::new());
        let graph = Arc::new(graph);
        let context = Arc::new(Context::new());
        let node_handle: Arc<dyn NodeHandle> = node.clone();
        let node_graph: Arc<dyn NodeGraph> = graph.clone();
        let client = ClientBase::new(node_handle, &node_graph, Arc::clone(&context), "svc")
            .unwrap();
        Fixture {
            node,
            graph,
            context,
            client,
        }
    }

    #[test]
    fn non_blocking_ready_does_not_wait() {
        let f = fixture(ScriptedGraph::new());
        f.node.set_ready(true);

        let ready = f.client.wait_for_service(WaitTimeout::NON_BLOCKING);
        assert!(ready.unwrap());
        assert_eq!(f.graph.wait_calls(), 0);
    }

    #[test]
    fn non_blocking_not_ready_does_not_wait() {
        let f = fixture(ScriptedGraph::new());

        let ready = f.client.wait_for_service(WaitTimeout::NON_BLOCKING);
        assert!(!ready.unwrap());
        assert_eq!(f.graph.wait_calls(), 0);
        assert_eq!(f.node.query_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn already_ready_returns_without_waiting_for_any_timeout() {
        for timeout in [WaitTimeout::INFINITE, WaitTimeout::from_millis(500)] {
            let f = fixture(ScriptedGraph::new());
            f.node.set_ready(true);
            assert!(f.client.wait_for_service(timeout).unwrap());
            assert_eq!(f.graph.wait_calls(), 0);
        }
    }

    #[test]
    fn fresh_event_per_wait_call() {
        let f = fixture(ScriptedGraph::new());
        f.node.set_ready(true);

        for _ in 0..2 {
            let ready = f.client.wait_for_service(WaitTimeout::NON_BLOCKING);
            assert!(ready.unwrap());
        }
        assert_eq!(f.graph.events_created(), 2);
    }

    #[test]
    fn bounded_wait_times_out_when_never_ready() {
        let f = fixture(ScriptedGraph::new());
        let timeout = Duration::from_millis(50);

        let start = Instant::now();
        assert!(!f.client.wait_for_service(timeout).unwrap());
        let elapsed = start.elapsed();

        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(1));
        assert!(f.graph.wait_calls() >= 1);
    }

    #[test]
    fn expired_positive_budget_still_gets_one_zero_wait() {
        let f = fixture(ScriptedGraph::new());
        // The second query (the one after the loop's first wait) reports ready.
        f.node.ready_from_query.store(2, Ordering::SeqCst);

        // The first query alone outlasts a one nanosecond budget.
        let ready = f.client.wait_for_service(WaitTimeout::from_nanos(1));
        assert!(ready.unwrap());
        let waits = f.graph.waits();
        assert_eq!(waits.len(), 1);
        assert!((0..=1).contains(&waits[0].as_nanos()));
    }

    #[test]
    fn expired_positive_budget_gives_up_after_one_wait() {
        let f = fixture(ScriptedGraph::new());

        let ready = f.client.wait_for_service(WaitTimeout::from_nanos(1));
        assert!(!ready.unwrap());
        let waits = f.graph.waits();
        assert_eq!(waits.len(), 1);
        assert!(!waits[0].is_infinite());
        assert_eq!(f.node.query_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn graph_event_wakes_waiter() {
        let f = fixture(ScriptedGraph::new());
        let node = Arc::clone(&f.node);
        let graph = Arc::clone(&f.graph);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            node.set_ready(true);
            graph.trigger_all();
        });

        let start = Instant::now();
        assert!(f.client.wait_for_service(WaitTimeout::INFINITE).unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn infinite_wait_sees_readiness_without_event() {
        // The event never fires; only the periodic wakeup lets the re-check run.
        let f = fixture(ScriptedGraph::with_slice(Duration::from_millis(10)));
        let node = Arc::clone(&f.node);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            node.set_ready(true);
        });

        assert!(f.client.wait_for_service(WaitTimeout::INFINITE).unwrap());
        assert!(f
            .graph
            .waits()
            .iter()
            .all(|timeout| timeout.is_infinite()));
        handle.join().unwrap();
    }

    #[test]
    fn spurious_events_are_cleared_between_waits() {
        let f = fixture(ScriptedGraph::new());
        let graph = Arc::clone(&f.graph);
        let node = Arc::clone(&f.node);

        // Trigger repeatedly without the service appearing, then make it ready.
        let handle = thread::spawn(move || {
            for _ in 0..3 {
                thread::sleep(Duration::from_millis(10));
                graph.trigger_all();
            }
            thread::sleep(Duration::from_millis(10));
            node.set_ready(true);
            graph.trigger_all();
        });

        assert!(f.client.wait_for_service(Duration::from_secs(5)).unwrap());
        handle.join().unwrap();
        // Each wait blocked until a fresh trigger instead of spinning on a stale one.
        assert!(f.graph.wait_calls() <= 4);
    }

    #[test]
    fn shutdown_interrupts_wait_within_one_slice() {
        let slice = Duration::from_millis(20);
        let f = fixture(ScriptedGraph::with_slice(slice));
        let context = Arc::clone(&f.context);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            context.shutdown("test");
        });

        let start = Instant::now();
        assert!(!f.client.wait_for_service(Duration::from_secs(30)).unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn shutdown_before_wait_skips_blocking() {
        let f = fixture(ScriptedGraph::new());
        f.context.shutdown("early");

        assert!(!f.client.wait_for_service(WaitTimeout::INFINITE).unwrap());
        assert_eq!(f.graph.wait_calls(), 0);
        // The initial readiness check still runs.
        assert_eq!(f.node.query_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_does_not_mask_ready_service() {
        let f = fixture(ScriptedGraph::new());
        f.context.shutdown("early");
        f.node.set_ready(true);

        assert!(f.client.wait_for_service(WaitTimeout::INFINITE).unwrap());
    }

    #[test]
    fn dropped_graph_is_invalid_node() {
        let f = fixture(ScriptedGraph::new());
        let Fixture { graph, client, .. } = f;
        drop(graph);

        let err = client.wait_for_service(WaitTimeout::INFINITE).unwrap_err();
        assert!(matches!(err, ClientError::InvalidNode));
    }

    #[test]
    fn query_failure_propagates_from_first_check() {
        let f = fixture(ScriptedGraph::new());
        f.node.fail_query.store(true, Ordering::SeqCst);

        let result = f.client.wait_for_service(WaitTimeout::INFINITE);
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Query {
                source: TransportError::NodeInvalid { .. },
                ..
            }
        ));
        assert_eq!(f.graph.wait_calls(), 0);
    }

    #[test]
    fn query_failure_mid_wait_is_not_retried() {
        let f = fixture(ScriptedGraph::with_slice(Duration::from_millis(5)));
        let node = Arc::clone(&f.node);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            node.fail_query.store(true, Ordering::SeqCst);
        });

        let result = f.client.wait_for_service(WaitTimeout::INFINITE);
        let err = result.unwrap_err();
        assert!(matches!(err, ClientError::Query { .. }));
        handle.join().unwrap();
    }

    #[test]
    fn graph_wait_failure_is_query_error() {
        let f = fixture(ScriptedGraph::new());
        f.graph.fail_wait.store(true, Ordering::SeqCst);

        let result = f.client.wait_for_service(WaitTimeout::INFINITE);
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Query {
                ref service_name,
                source: TransportError::Internal(_),
            } if service_name == "svc"
        ));
        assert_eq!(f.graph.wait_calls(), 1);
        // The ready check after a failed wait is skipped.
        assert_eq!(f.node.query_calls.load(Ordering::SeqCst), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn never_ready_wait_is_bounded(millis in 0_u64..25) {
            let f = fixture(ScriptedGraph::new());
            let timeout = Duration::from_millis(millis);

            let start = Instant::now();
            prop_assert!(!f.client.wait_for_service(timeout).unwrap());
            let elapsed = start.elapsed();

            prop_assert!(elapsed >= timeout);
            prop_assert!(elapsed < timeout + Duration::from_millis(500));
        }
    }
}
