//! Shared helpers for integration tests: a real node bound to an
//! ephemeral loopback port, plus a connected client.

use minikv::{ClientConfig, KvClient, NodeBuilder, NodeConfig, Result, ServerConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub endpoint: String,
    shutdown_tx: watch::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

pub async fn spawn_server() -> TestServer {
    let settings = NodeConfig {
        server: ServerConfig {
            listen_address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        },
        ..NodeConfig::default()
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let node = NodeBuilder::init(settings, shutdown_rx)
        .build()
        .await
        .expect("failed to build node");
    let addr = node.local_addr().expect("no local addr");

    let handle = tokio::spawn(node.run());

    TestServer {
        endpoint: format!("http://{addr}"),
        shutdown_tx,
        handle,
    }
}

impl TestServer {
    pub async fn client(&self) -> KvClient {
        KvClient::connect(self.endpoint.clone(), ClientConfig::default())
            .await
            .expect("failed to connect client")
    }

    #[allow(dead_code)]
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}
