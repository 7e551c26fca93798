//! Transport-level error type shared by every `NodeHandle` implementation.

/// Errors reported by the underlying transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("node '{node}' is no longer valid")]
    NodeInvalid { node: String },
    #[error("client handle is not initialized")]
    ClientInvalid,
    #[error("client handle is already initialized")]
    AlreadyInitialized,
    #[error("invalid service name '{name}': {reason}")]
    InvalidServiceName { name: String, reason: &'static str },
    #[error("transport error: {0}")]
    Internal(#[from] anyhow::Error),
}
