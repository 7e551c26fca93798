//! Tether Core — graph change events, signed wait timeouts, the shutdown
//! context, raw client handles, and the transport traits clients build on.

pub mod context;
pub mod error;
pub mod event;
pub mod handle;
pub mod timeout;
pub mod traits;

pub use context::{ok, shutdown, Context, ContextState, ShutdownCallbackId};
pub use error::TransportError;
pub use event::{GraphEvent, WaitResult};
pub use handle::RawClient;
pub use timeout::WaitTimeout;
pub use traits::{NodeGraph, NodeHandle};
