//! The coordination service: owns grid state, partitions, dispatches,
//! merges, publishes.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use colony_core::codec::BrokerServerCodec;
use colony_core::wire::{BrokerRequest, BrokerResponse, StepRequest, StepResponse};
use colony_core::{Cell, Generation, StepKind};

use crate::error::TurnError;
use crate::gateway::WorkerGateway;
use crate::partition::partition_rows;

/// How many times a single worker call is attempted before the turn
/// aborts.
const CALL_ATTEMPTS: usize = 3;

/// Coordination service owning the current generation.
///
/// All turn-mutating calls serialize on the state mutex: the lock is held
/// from partitioning through publish, so at most one turn is in flight.
pub struct Broker<G> {
    state: Mutex<Option<Generation>>,
    gateway: Arc<G>,
}

impl<G: WorkerGateway> Broker<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            state: Mutex::new(None),
            gateway,
        }
    }

    /// Establishes or resets the grid state. Overwrites unconditionally.
    pub async fn transfer(&self, generation: Generation) -> Result<(), TurnError> {
        generation.validate()?;
        let mut state = self.state.lock().await;
        info!(
            width = generation.width(),
            height = generation.height(),
            "grid transferred"
        );
        *state = Some(generation);
        Ok(())
    }

    /// Executes one turn: partition, dispatch, join, merge, publish.
    ///
    /// On any failure the stored generation is left untouched - a band is
    /// never substituted with zeroes.
    pub async fn step(
        &self,
        workers: &[String],
        kind: StepKind,
    ) -> Result<(Generation, Vec<Cell>), TurnError> {
        let mut state = self.state.lock().await;
        let current = state.as_ref().ok_or(TurnError::NotInitialised)?.clone();
        let ranges = partition_rows(current.height(), current.width(), workers.len())?;

        let mut calls = Vec::with_capacity(workers.len());
        for (addr, range) in workers.iter().zip(&ranges) {
            let gateway = Arc::clone(&self.gateway);
            let addr = addr.clone();
            let request = StepRequest {
                range: *range,
                generation: current.clone(),
                kind,
            };
            calls.push((
                addr.clone(),
                tokio::spawn(async move { step_with_retry(gateway.as_ref(), &addr, request).await }),
            ));
        }

        // Join barrier: every call settles before any failure surfaces,
        // and merge order is partition order, not arrival order.
        let mut settled = Vec::with_capacity(calls.len());
        for (addr, handle) in calls {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(TurnError::Connection {
                    addr,
                    message: format!("dispatch task failed: {e}"),
                }),
            };
            settled.push(result);
        }
        let mut responses = Vec::with_capacity(settled.len());
        for result in settled {
            responses.push(result?);
        }

        let (next, flipped) = merge_bands(&current, &ranges, &responses)?;
        debug!(flipped = flipped.len(), "turn merged");
        *state = Some(next.clone());
        Ok((next, flipped))
    }

    /// Broadcasts worker shutdown. Best-effort: failures are logged and
    /// the count of successfully notified workers is returned.
    pub async fn kill_fleet(&self, workers: &[String]) -> usize {
        let mut notified = 0;
        for addr in workers {
            match self.gateway.shutdown(addr).await {
                Ok(()) => notified += 1,
                Err(e) => warn!(addr = addr.as_str(), error = %e, "shutdown notification failed"),
            }
        }
        info!(notified, total = workers.len(), "fleet shutdown broadcast");
        notified
    }

    /// Accept loop. Each client connection gets its own task;
    /// turn-mutating requests still serialize on the state mutex.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!(%peer, "client connected");
            let broker = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = broker.handle_client(stream).await {
                    warn!(%peer, error = %e, "client connection ended with error");
                }
            });
        }
    }

    async fn handle_client(&self, stream: TcpStream) -> Result<(), TurnError> {
        let mut framed = Framed::new(stream, BrokerServerCodec::new());
        while let Some(request) = framed.next().await {
            let response = match request? {
                BrokerRequest::Transfer { generation } => match self.transfer(generation).await {
                    Ok(()) => BrokerResponse::TransferAck,
                    Err(e) => BrokerResponse::Error {
                        message: e.to_string(),
                    },
                },
                BrokerRequest::Step { workers, kind } => match self.step(&workers, kind).await {
                    Ok((generation, flipped)) => BrokerResponse::Step { generation, flipped },
                    Err(e) => {
                        warn!(error = %e, "turn aborted");
                        BrokerResponse::Error {
                            message: e.to_string(),
                        }
                    }
                },
                BrokerRequest::KillFleet { workers } => {
                    let notified = self.kill_fleet(&workers).await;
                    BrokerResponse::KillFleetAck { notified }
                }
            };
            framed.send(response).await?;
        }
        Ok(())
    }
}

/// Concatenates band responses in partition order into the next
/// generation, verifying the coverage invariant.
fn merge_bands(
    current: &Generation,
    ranges: &[colony_core::PartitionRange],
    responses: &[StepResponse],
) -> Result<(Generation, Vec<Cell>), TurnError> {
    let width = current.width();
    let height = current.height();

    let mut cells = Vec::with_capacity(width * height);
    let mut flipped = Vec::new();
    for (range, response) in ranges.iter().zip(responses) {
        if response.rows.len() != range.rows() * range.cols() {
            return Err(TurnError::PartitionMismatch {
                expected: range.rows(),
                actual: response.rows.len() / range.cols().max(1),
            });
        }
        cells.extend_from_slice(&response.rows);
        flipped.extend_from_slice(&response.flipped);
    }

    if cells.len() != width * height {
        return Err(TurnError::PartitionMismatch {
            expected: height,
            actual: cells.len() / width,
        });
    }

    let next = Generation::from_bytes(width, height, cells)?;
    Ok((next, flipped))
}

async fn step_with_retry<G: WorkerGateway + ?Sized>(
    gateway: &G,
    addr: &str,
    request: StepRequest,
) -> Result<StepResponse, TurnError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match gateway.step(addr, request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) if attempt < CALL_ATTEMPTS => {
                warn!(addr, attempt, error = %e, "worker call failed, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}
