//! Colony broker service binary.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use colony_broker::gateway::TcpWorkerGateway;
use colony_broker::service::Broker;

/// Coordinates Game of Life turns across a worker fleet.
#[derive(Parser, Debug)]
#[command(name = "colony-broker")]
#[command(about = "Coordinates Game of Life turns across a worker fleet", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8030")]
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
    info!(port = args.port, "broker listening");

    let broker = Arc::new(Broker::new(Arc::new(TcpWorkerGateway::new())));
    broker.serve(listener).await?;
    Ok(())
}
