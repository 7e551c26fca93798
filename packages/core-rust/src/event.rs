//! Edge-triggered graph change events.
//!
//! A `GraphEvent` is set whenever the communication graph changes and stays
//! set until a consumer calls `check_and_clear()`. Any number of changes
//! between two clears collapse into a single trigger.

use std::fmt;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::timeout::WaitTimeout;

/// Outcome of blocking on a [`GraphEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// The event was set before the timeout elapsed.
    Triggered,
    /// The timeout elapsed without the event being set.
    TimedOut,
}

/// Reusable edge-triggered flag with an associated wait primitive.
pub struct GraphEvent {
    triggered: Mutex<bool>,
    cond: Condvar,
}

impl fmt::Debug for GraphEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphEvent")
            .field("triggered", &*self.triggered.lock())
            .finish()
    }
}

impl GraphEvent {
    /// Creates an untriggered event.
    #[must_use]
    pub fn new() -> Self {
        Self {
            triggered: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Sets the event and wakes every thread blocked in [`GraphEvent::wait`].
    ///
    /// Returns the previous state.
    pub fn set(&self) -> bool {
        let mut triggered = self.triggered.lock();
        let previous = std::mem::replace(&mut *triggered, true);
        self.cond.notify_all();
        previous
    }

    /// Returns the current state without clearing it.
    #[must_use]
    pub fn check(&self) -> bool {
        *self.triggered.lock()
    }

    /// Returns the current state and clears it.
    pub fn check_and_clear(&self) -> bool {
        std::mem::replace(&mut *self.triggered.lock(), false)
    }

    /// Blocks until the event is set or `timeout` elapses.
    ///
    /// Does not clear the event. A zero timeout only inspects the flag; a
    /// negative timeout waits until the event is set.
    pub fn wait(&self, timeout: WaitTimeout) -> WaitResult {
        let mut triggered = self.triggered.lock();
        if *triggered {
            return WaitResult::Triggered;
        }

        let Some(duration) = timeout.to_duration() else {
            while !*triggered {
                self.cond.wait(&mut triggered);
            }
            return WaitResult::Triggered;
        };

        // Instant overflow on absurd durations degrades to an unbounded wait.
        let Some(deadline) = Instant::now().checked_add(duration) else {
            while !*triggered {
                self.cond.wait(&mut triggered);
            }
            return WaitResult::Triggered;
        };

        while !*triggered {
            if self.cond.wait_until(&mut triggered, deadline).timed_out() {
                break;
            }
        }

        if *triggered {
            WaitResult::Triggered
        } else {
            WaitResult::TimedOut
        }
    }
}

impl Default for GraphEvent {
    fn default() -> Self {
        Self::new()
    }
}
