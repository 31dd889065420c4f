//! Tail a user's notification stream.
//!
//! Demonstrates:
//! - Building a per-user endpoint
//! - Exponential backoff with jitter
//! - Subscribing and printing notifications as they arrive
//! - Observing state changes and availability notices
//! - Graceful shutdown on Ctrl+C
//!
//! Usage:
//!   cargo run --example tail -- ws://127.0.0.1:8000 42 <token>
//!   cargo run --example tail -- ws://127.0.0.1:8000 42 <token> --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::{Context, bail};
use notify_channel::{
    ChannelNotice, ChannelOptions, ConnectionEndpoint, ExponentialBackoff, create_channel,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    base_url: String,
    user_id: String,
    token: String,
    debug: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let debug = std::env::args().any(|a| a == "--debug");
        let positional: Vec<String> = std::env::args()
            .skip(1)
            .filter(|a| !a.starts_with("--"))
            .collect();

        let [base_url, user_id, token] = positional.as_slice() else {
            bail!("usage: tail <base_url> <user_id> <token> [--debug]");
        };

        Ok(Self {
            base_url: base_url.clone(),
            user_id: user_id.clone(),
            token: token.clone(),
            debug,
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Tail: {} ===\n", args.user_id);

    let endpoint = ConnectionEndpoint::for_user(&args.base_url, &args.user_id, &args.token)
        .context("invalid endpoint")?;

    let options = ChannelOptions::new()
        .with_reconnect_policy(
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(30))
                .with_jitter(0.2),
        )
        .on_notice(|notice| match notice {
            ChannelNotice::StateChanged { to, .. } => println!("[State] {to}"),
            ChannelNotice::Unavailable { attempts } => {
                println!("[Notice] Real-time updates unavailable after {attempts} attempts");
            }
            ChannelNotice::Restored => println!("[Notice] Real-time updates restored"),
        });

    let channel = create_channel(endpoint, options)?;

    channel.subscribe(|record| {
        println!("[{}] {}", record.id(), record.message());
    });

    channel.start()?;

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();

    channel.shutdown().await;

    let stats = channel.stats();
    println!(
        "\n[Done] delivered={} duplicates={} malformed={} connections={}",
        stats.delivered, stats.duplicates_dropped, stats.malformed_dropped, stats.connections_opened
    );

    Ok(())
}

// ============================================================================
// Functions
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "notify_channel=debug"
    } else {
        "notify_channel=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
