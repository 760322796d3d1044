use std::time::Duration;

/// Connection parameters for [`super::KvClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for establishing the TCP/HTTP2 connection.
    pub connect_timeout: Duration,

    /// Per-request deadline. Streaming calls are bounded on response
    /// headers only; the stream itself lives until cancelled.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}
