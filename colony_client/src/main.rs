//! Colony client binary: seeds the run and drives the orchestrator.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use colony_core::{Generation, SimParams, StepKind, ALIVE, DEAD};

use colony_client::broker::TcpBroker;
use colony_client::events::{log_events, EventSink};
use colony_client::input::spawn_key_reader;
use colony_client::io::{FileIo, IoGateway};
use colony_client::orchestrator::{input_key, Orchestrator, RunConfig};

/// Drives a distributed Game of Life run.
#[derive(Parser, Debug)]
#[command(name = "colony-client")]
#[command(about = "Drives a distributed Game of Life run", long_about = None)]
struct Args {
    /// Broker address
    #[arg(long, default_value = "127.0.0.1:8030")]
    broker: String,

    /// Worker addresses in partition order, comma separated
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "127.0.0.1:8040,127.0.0.1:8050,127.0.0.1:8060,127.0.0.1:8070"
    )]
    workers: Vec<String>,

    /// Grid width
    #[arg(long, default_value = "16")]
    width: usize,

    /// Grid height
    #[arg(long, default_value = "16")]
    height: usize,

    /// Turns to run
    #[arg(short, long, default_value = "100")]
    turns: usize,

    /// Stepper implementation (conway, identity)
    #[arg(long, default_value = "conway")]
    stepper: StepKind,

    /// Directory holding input images named {width}x{height}.pgm
    #[arg(long, default_value = "images")]
    images_dir: PathBuf,

    /// Directory receiving snapshots
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Seconds between alive-count reports
    #[arg(long, default_value = "2")]
    poll_secs: u64,

    /// Seed the grid randomly with this alive probability instead of
    /// loading an image
    #[arg(long)]
    random_fill: Option<f64>,

    /// Disable keyboard commands
    #[arg(long)]
    headless: bool,

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

    if args.workers.is_empty() {
        bail!("at least one worker address is required");
    }

    let params = SimParams {
        width: args.width,
        height: args.height,
        turns: args.turns,
    };
    let io = FileIo::spawn(&args.images_dir, &args.out_dir);

    let seed = match args.random_fill {
        Some(probability) => random_generation(params.width, params.height, probability)?,
        None => io.load(&input_key(&params)).await?,
    };
    if seed.width() != params.width || seed.height() != params.height {
        bail!(
            "input image is {}x{}, expected {}x{}",
            seed.width(),
            seed.height(),
            params.width,
            params.height
        );
    }

    info!(
        broker = args.broker.as_str(),
        workers = args.workers.len(),
        turns = params.turns,
        "starting run"
    );
    let broker = TcpBroker::connect(&args.broker).await?;

    let (events, events_rx) = EventSink::channel();
    let logger = tokio::spawn(log_events(events_rx));

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    if args.headless {
        drop(command_tx);
    } else {
        spawn_key_reader(command_tx);
    }

    let config = RunConfig {
        params,
        workers: args.workers,
        kind: args.stepper,
        poll_interval: Duration::from_secs(args.poll_secs),
    };
    let orchestrator = Orchestrator::new(config, broker, io, events, command_rx, seed);

    let outcome = orchestrator.run().await;
    logger.await?;
    let summary = outcome?;

    info!(
        turns = summary.turns,
        alive = summary.alive,
        "simulation complete"
    );
    Ok(())
}

fn random_generation(width: usize, height: usize, probability: f64) -> Result<Generation> {
    use rand::Rng;

    let probability = probability.clamp(0.0, 1.0);
    let mut rng = rand::thread_rng();
    let cells = (0..width * height)
        .map(|_| if rng.gen_bool(probability) { ALIVE } else { DEAD })
        .collect();
    Ok(Generation::from_bytes(width, height, cells)?)
}
