//! Listener and logging configuration.

use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Configuration of the gRPC listener and process-level logging.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the gRPC server binds to.
    pub listen_address: String,

    /// Directory for log files. Empty means log to stdout.
    pub log_dir: String,

    /// Buffer size of the per-call channels that relay range snapshots
    /// and watch events to the transport.
    pub stream_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:50051".to_string(),
            log_dir: String::new(),
            stream_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Parsed form of `listen_address`.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.listen_address.parse::<SocketAddr>()?)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.stream_buffer == 0 {
            return Err(crate::Error::Fatal(
                "server.stream_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
