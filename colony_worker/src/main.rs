//! Colony worker service binary.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use colony_worker::serve;

/// Computes next-generation partitions on behalf of the broker.
#[derive(Parser, Debug)]
#[command(name = "colony-worker")]
#[command(about = "Computes Game of Life partitions for the broker", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8040")]
    port: u16,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!(port = args.port, "worker listening");

    serve(listener, Arc::new(Notify::new())).await?;
    info!("worker exiting");
    Ok(())
}
