//! Interactive command-line client.
//!
//! ```text
//! > put greeting hello
//! > get greeting
//! ("greeting", "hello")
//! > range
//! ("greeting", "hello")
//! > watch user/
//! [watching "user/" — ctrl+c to stop]
//! > del greeting
//! ```

use clap::Parser;
use minikv::{ClientConfig, KvClient};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minikv-cli")]
#[command(about = "Interactive client for minikv", long_about = None)]
struct Args {
    /// Server endpoint
    #[arg(long, default_value = "http://127.0.0.1:50051")]
    endpoint: String,
}

const HELP: &str = "commands:
  get <key>            look a key up
  put <key> <value>    store a value
  del <key>            delete a key
  range [start]        list entries from start (default: all)
  watch [prefix]       stream changes matching prefix (ctrl+c stops)
  help                 show this help
  quit                 exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut client = KvClient::connect(args.endpoint.clone(), ClientConfig::default()).await?;
    println!("connected to {}", args.endpoint);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts.as_slice() {
            [] => {}
            ["quit"] | ["exit"] => break,
            ["help"] => println!("{HELP}"),
            ["get", key] => match client.get(*key).await {
                Ok(Some(value)) => println!("({key:?}, {value:?})"),
                Ok(None) => println!("(not found)"),
                Err(e) => eprintln!("error: {e}"),
            },
            ["put", key, value] => match client.put(*key, *value).await {
                Ok(()) => {}
                Err(e) => eprintln!("error: {e}"),
            },
            ["del", key] => match client.delete(*key).await {
                Ok(()) => {}
                Err(e) => eprintln!("error: {e}"),
            },
            ["range"] => print_range(&mut client, "").await,
            ["range", start] => print_range(&mut client, start).await,
            ["watch"] => run_watch(&mut client, "").await,
            ["watch", prefix] => run_watch(&mut client, prefix).await,
            _ => println!("unknown command (try `help`)"),
        }
    }

    Ok(())
}

async fn print_range(client: &mut KvClient, start_key: &str) {
    match client.range(start_key).await {
        Ok(entries) => {
            for (key, value) in entries {
                println!("({key:?}, {value:?})");
            }
        }
        Err(e) => eprintln!("error: {e}"),
    }
}

/// Stream watch events until ctrl+c.
async fn run_watch(client: &mut KvClient, prefix: &str) {
    let mut stream = match client.watch(prefix).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("error: {e}");
            return;
        }
    };

    println!("[watching {prefix:?} — ctrl+c to stop]");
    loop {
        tokio::select! {
            message = stream.message() => match message {
                Ok(Some(entry)) => match entry.value {
                    Some(value) => println!("PUT ({:?}, {:?})", entry.key, value),
                    None => println!("DEL ({:?})", entry.key),
                },
                Ok(None) => {
                    println!("[watch ended by server]");
                    return;
                }
                Err(e) => {
                    eprintln!("watch error: {e}");
                    return;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("[watch stopped]");
                return;
            }
        }
    }
}
