//! Client-side error taxonomy.

#[derive(Debug, thiserror::Error)]
pub enum ClientApiError {
    /// The endpoint string could not be parsed into a URI
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connection establishment or channel-level failures
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The server answered with a non-OK status
    #[error("RPC failed: {0}")]
    Rpc(#[from] tonic::Status),
}

impl ClientApiError {
    /// Whether the error is the server telling us a key does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientApiError::Rpc(status) if status.code() == tonic::Code::NotFound)
    }
}
