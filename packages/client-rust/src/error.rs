use tether_core::TransportError;

/// Errors surfaced by client endpoints.
///
/// A wait that gives up because the timeout elapsed is not an error; it
/// returns `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not create client for service '{service_name}': {source}")]
    Initialization {
        service_name: String,
        #[source]
        source: TransportError,
    },
    #[error("node backing this client no longer exists")]
    InvalidNode,
    #[error("availability query for service '{service_name}' failed: {source}")]
    Query {
        service_name: String,
        #[source]
        source: TransportError,
    },
}
