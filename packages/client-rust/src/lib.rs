//! Tether Client — service client endpoints that own their transport handle
//! and wait for services using graph change events.

pub mod client;
pub mod config;
pub mod error;
pub mod node;
pub mod transport;

pub use client::{ClientBase, ClientHandle};
pub use config::{GraphConfig, NodeConfig};
pub use error::ClientError;
pub use node::Node;
pub use transport::{MemoryGraph, ServiceAdvertisement};
