//! Raw client handle.
//!
//! A `RawClient` starts zero-initialized and is filled in by a transport's
//! `NodeHandle::client_init`. The transport stores whatever per-client state
//! it needs behind a type-erased box; only that transport knows the concrete
//! type.

use std::any::Any;
use std::fmt;

use crate::error::TransportError;

/// Transport-owned state of one client endpoint.
#[derive(Default)]
pub struct RawClient {
    implementation: Option<Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for RawClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawClient")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl RawClient {
    /// Returns a handle with no transport state attached.
    #[must_use]
    pub fn zero_initialized() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.implementation.is_some()
    }

    /// Attaches transport state.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInitialized` if state is already attached.
    pub fn install<T>(&mut self, state: T) -> Result<(), TransportError>
    where
        T: Any + Send + Sync,
    {
        if self.implementation.is_some() {
            return Err(TransportError::AlreadyInitialized);
        }
        self.implementation = Some(Box::new(state));
        Ok(())
    }

    /// Borrows the attached state if it has type `T`.
    #[must_use]
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.implementation.as_deref()?.downcast_ref::<T>()
    }

    /// Detaches the state if it has type `T`, leaving the handle
    /// zero-initialized.
    pub fn take_state<T: Any>(&mut self) -> Option<Box<T>> {
        match self.implementation.take()?.downcast::<T>() {
            Ok(state) => Some(state),
            Err(other) => {
                self.implementation = Some(other);
                None
            }
        }
    }

    /// Drops any attached state without consulting the transport.
    ///
    /// Used when finalization failed and the state would otherwise leak.
    pub fn release(&mut self) {
        self.implementation = None;
    }
}
