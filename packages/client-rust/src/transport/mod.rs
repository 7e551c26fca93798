//! Transport implementations of the `tether-core` node traits.

pub mod memory;

pub use memory::{MemoryGraph, MemoryNodeGraph, MemoryNodeHandle, ServiceAdvertisement};
