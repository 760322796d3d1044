use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::debug;

use crate::config::NodeConfig;
use crate::store::KvStore;
use crate::watch::WatchHub;
use crate::Result;

use super::Node;

/// Builder that validates configuration, binds the listener and wires the
/// store to the watch hub.
pub struct NodeBuilder {
    settings: NodeConfig,
    shutdown_rx: watch::Receiver<()>,
}

impl NodeBuilder {
    pub fn init(settings: NodeConfig, shutdown_rx: watch::Receiver<()>) -> Self {
        Self {
            settings,
            shutdown_rx,
        }
    }

    /// Bind the configured address and assemble the node.
    ///
    /// The watch dispatcher is started here so that the first put/delete
    /// after `build` already fans out.
    pub async fn build(self) -> Result<Node> {
        self.settings.validate()?;

        let addr = self.settings.server.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        debug!(address = %listener.local_addr()?, "listener bound");

        let hub = Arc::new(WatchHub::new(self.settings.watch.clone()));
        hub.start();

        let store = Arc::new(KvStore::new(Arc::clone(&hub)));

        Ok(Node {
            settings: self.settings,
            store,
            hub,
            listener,
            shutdown_rx: self.shutdown_rx,
        })
    }
}
