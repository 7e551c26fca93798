//! Process-wide lifecycle context with cooperative shutdown.
//!
//! Uses `ArcSwap` for lock-free state reads from hot wait loops and a
//! mutex-guarded callback list so blocked waiters can be woken when
//! shutdown begins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::info;

/// Lifecycle state of a [`Context`].
///
/// State machine: Running -> `ShuttingDown` -> Shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Normal operation; waits may block.
    Running,
    /// Shutdown was requested and callbacks are running.
    ShuttingDown,
    /// All shutdown callbacks have completed.
    Shutdown,
}

type ShutdownCallback = Box<dyn Fn() + Send + Sync>;

/// Identifies a callback registered with [`Context::on_shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShutdownCallbackId(u64);

/// Cooperative cancellation scope shared by nodes and their clients.
///
/// Blocking operations poll [`Context::is_shutdown_requested`] between wait
/// slices. Components that block on their own primitives register an
/// [`Context::on_shutdown`] callback to wake themselves.
pub struct Context {
    state: ArcSwap<ContextState>,
    reason: Mutex<Option<String>>,
    callbacks: Mutex<Vec<(ShutdownCallbackId, ShutdownCallback)>>,
    next_callback_id: AtomicU64,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.state())
            .field("reason", &*self.reason.lock())
            .field("callbacks", &self.callbacks.lock().len())
            .finish()
    }
}

impl Context {
    /// Creates a context in the `Running` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(ContextState::Running),
            reason: Mutex::new(None),
            callbacks: Mutex::new(Vec::new()),
            next_callback_id: AtomicU64::new(0),
        }
    }

    /// Returns the process-wide default context.
    pub fn global() -> &'static Arc<Context> {
        static GLOBAL: OnceLock<Arc<Context>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Context::new()))
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ContextState {
        **self.state.load()
    }

    /// Returns `true` while the context is running.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.state() == ContextState::Running
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        !self.ok()
    }

    /// The reason passed to the first [`Context::shutdown`] call, if any.
    #[must_use]
    pub fn shutdown_reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Registers a callback run once when shutdown begins.
    ///
    /// If shutdown was already requested the callback runs immediately on the
    /// calling thread. Owners that go away before shutdown should pass the
    /// returned id to [`Context::remove_on_shutdown`].
    pub fn on_shutdown<F>(&self, callback: F) -> ShutdownCallbackId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ShutdownCallbackId(self.next_callback_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut callbacks = self.callbacks.lock();
            if self.ok() {
                callbacks.push((id, Box::new(callback)));
                return id;
            }
        }
        callback();
        id
    }

    /// Unregisters a shutdown callback.
    ///
    /// Returns `false` if it already ran or was never registered.
    pub fn remove_on_shutdown(&self, id: ShutdownCallbackId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(registered, _)| *registered != id);
        callbacks.len() != before
    }

    /// Number of callbacks waiting for shutdown.
    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Requests shutdown and runs the registered callbacks.
    ///
    /// Returns `false` if shutdown had already been requested.
    pub fn shutdown(&self, reason: &str) -> bool {
        let callbacks = {
            let mut callbacks = self.callbacks.lock();
            if !self.ok() {
                return false;
            }
            self.state.store(Arc::new(ContextState::ShuttingDown));
            *self.reason.lock() = Some(reason.to_string());
            std::mem::take(&mut *callbacks)
        };

        info!(reason, callbacks = callbacks.len(), "context shutdown requested");
        for (_, callback) in &callbacks {
            callback();
        }

        self.state.store(Arc::new(ContextState::Shutdown));
        true
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns `true` while the global context is running.
#[must_use]
pub fn ok() -> bool {
    Context::global().ok()
}

/// Requests shutdown of the global context.
pub fn shutdown(reason: &str) -> bool {
    Context::global().shutdown(reason)
}
