//! Node assembly and runtime.
//!
//! A [`Node`] owns the bound listener, the store, and the watch hub, and
//! drives the gRPC serve loop until the shutdown signal fires.

mod builder;


pub use builder::NodeBuilder;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::CompressionEncoding;
use tracing::info;

use crate::config::NodeConfig;
use crate::network::KvsService;
use crate::proto::kvs::kvs_server::KvsServer;
use crate::store::KvStore;
use crate::watch::WatchHub;
use crate::Result;

/// A fully wired key/value node, ready to serve.
#[derive(Debug)]
pub struct Node {
    settings: NodeConfig,
    store: Arc<KvStore>,
    hub: Arc<WatchHub>,
    listener: TcpListener,
    shutdown_rx: watch::Receiver<()>,
}

impl Node {
    /// Address the listener is actually bound to. Useful when the
    /// configured port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared handle to the store, e.g. for embedding or tests.
    pub fn store(&self) -> Arc<KvStore> {
        Arc::clone(&self.store)
    }

    /// Serve gRPC until the shutdown signal fires, then stop the watch
    /// dispatcher.
    pub async fn run(self) -> Result<()> {
        let addr = self.listener.local_addr()?;
        info!(address = %addr, "gRPC server listening");

        let service = KvsService::new(Arc::clone(&self.store), self.settings.server.stream_buffer);

        let mut shutdown_rx = self.shutdown_rx;
        let incoming = TcpListenerStream::new(self.listener);

        tonic::transport::Server::builder()
            .add_service(
                KvsServer::new(service)
                    .accept_compressed(CompressionEncoding::Gzip)
                    .send_compressed(CompressionEncoding::Gzip),
            )
            .serve_with_incoming_shutdown(incoming, async move {
                let _ = shutdown_rx.changed().await;
                info!("shutdown signal received, stopping gRPC server");
            })
            .await?;

        self.hub.stop();
        info!("node stopped");
        Ok(())
    }
}
