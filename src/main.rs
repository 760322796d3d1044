use std::path::Path;

use minikv::utils::open_file_for_append;
use minikv::{Error, NodeBuilder, NodeConfig, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = NodeConfig::load(None)?;

    // Initializing logs
    let _guard = init_observability(&settings.server.log_dir)?;

    // Initializing shutdown signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    // Build node
    let node = NodeBuilder::init(settings, graceful_rx).build().await?;

    info!("Application started. Waiting for CTRL+C signal...");
    // Listen on shutdown signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    // Start node
    if let Err(e) = node.run().await {
        error!("node stops: {:?}", e);
    }

    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::Fatal(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown completed");
    Ok(())
}

/// Set up tracing output: a non-blocking file appender when `log_dir` is
/// configured, stdout otherwise. The returned guard must stay alive for
/// the process lifetime so buffered log lines are flushed.
fn init_observability(log_dir: &str) -> Result<Option<WorkerGuard>> {
    if log_dir.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
        return Ok(None);
    }

    let log_file = open_file_for_append(Path::new(log_dir).join("minikv.log"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(Some(guard))
}
