//! Load generator for a running minikv server.
//!
//! Spawns `--clients` concurrent workers that issue `--total` put requests
//! between them (random keys of `--key-size` bytes, values of
//! `--value-size` bytes), then prints a throughput summary. With
//! `--verify`, every worker reads one of its own keys back at the end.

use std::time::Instant;

use clap::Parser;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use minikv::{ClientConfig, KvClient};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::task;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minikv-bench")]
#[command(about = "Benchmark util for minikv", long_about = None)]
pub struct Args {
    /// Server endpoint
    #[arg(long, default_value = "http://127.0.0.1:50051")]
    pub endpoint: String,

    /// Number of concurrent client workers
    #[arg(long, default_value_t = 1)]
    pub clients: usize,

    /// Total number of put requests across all workers
    #[arg(long, default_value_t = 1000)]
    pub total: usize,

    #[arg(long, default_value_t = 8)]
    pub key_size: usize,

    #[arg(long, default_value_t = 256)]
    pub value_size: usize,

    /// Read one key back per worker after the run
    #[arg(long, default_value_t = false)]
    pub verify: bool,
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

async fn send_requests(
    endpoint: String,
    worker_id: usize,
    requests: usize,
    key_size: usize,
    value_size: usize,
    verify: bool,
) -> usize {
    let mut client = match KvClient::connect(endpoint, ClientConfig::default()).await {
        Ok(client) => client,
        Err(e) => {
            error!(worker_id, "failed to connect: {}", e);
            return 0;
        }
    };

    let mut successes = 0;
    let mut last_key = String::new();
    for _ in 0..requests {
        let key = format!("bench/{}/{}", worker_id, random_string(key_size));
        let value = random_string(value_size);
        match client.put(key.clone(), value).await {
            Ok(()) => {
                successes += 1;
                last_key = key;
            }
            Err(e) => error!(worker_id, "put failed: {}", e),
        }
    }

    if verify && !last_key.is_empty() {
        match client.get(last_key.clone()).await {
            Ok(Some(_)) => info!(worker_id, key = %last_key, "verify read ok"),
            Ok(None) => error!(worker_id, key = %last_key, "verify read missing"),
            Err(e) => error!(worker_id, "verify read failed: {}", e),
        }
    }

    successes
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Args::parse();
    let main_start = Instant::now();

    let max_per_client = cli.total.div_ceil(cli.clients.max(1));

    let mut tasks = FuturesUnordered::new();
    for worker_id in 0..cli.clients.max(1) {
        tasks.push(task::spawn(send_requests(
            cli.endpoint.clone(),
            worker_id,
            max_per_client,
            cli.key_size,
            cli.value_size,
            cli.verify,
        )));
    }

    let mut success_count = 0;
    while let Some(result) = tasks.next().await {
        match result {
            Ok(successes) => success_count += successes,
            Err(e) => error!("Task failed with error: {:?}", e),
        }
    }

    let elapsed = Instant::now().duration_since(main_start);
    let sent = max_per_client * cli.clients.max(1);
    println!(
        "Summary:\n  Sent: {}, Success: {}, Failed: {}\n  Total Time: {:.2?}\n  Throughput: {:.0} ops/sec",
        sent,
        success_count,
        sent - success_count,
        elapsed,
        success_count as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    );
}
