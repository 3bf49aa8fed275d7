//! murmur terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Connect to a local server and pick a name interactively
//! murmur
//!
//! # Join a remote server as Alice, re-registering after every reconnect
//! murmur --server ws://chat.example:3000 --name Alice
//! ```

use clap::Parser;
use murmur_cli::Shell;
use murmur_client::{ClientConfig, ClientHandle, config::DEFAULT_SERVER_URL};
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Terminal chat client
#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(about = "Terminal client for murmur chat servers")]
#[command(version)]
struct Args {
    /// WebSocket URL of the chat server
    #[arg(short, long, default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Display name to register on every connect
    ///
    /// Without it, the first line typed after connecting is used.
    #[arg(short, long)]
    name: Option<String>,

    /// Reconnect attempts before giving up
    #[arg(long, default_value_t = 5)]
    max_reconnect_attempts: u32,

    /// Re-register the last submitted name after a reconnect
    #[arg(long)]
    auto_rejoin: bool,

    /// Keep at most this many timeline entries
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    history: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = ClientConfig::new(args.server)
        .with_max_reconnect_attempts(args.max_reconnect_attempts)
        .with_auto_rejoin(args.auto_rejoin)
        .with_timeline_capacity(args.history)
        .with_auto_connect(false);

    tracing::info!(url = %config.server_url, "murmur starting");
    let handle = ClientHandle::connect_ws(config);

    let input = BufReader::new(tokio::io::stdin());
    Shell::new(handle, args.name).run(input, tokio::io::stdout()).await?;

    Ok(())
}
