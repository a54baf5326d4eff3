//! Client-side handle on the broker service.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::debug;

use colony_core::codec::BrokerClientCodec;
use colony_core::wire::{BrokerRequest, BrokerResponse};
use colony_core::{Cell, Generation, StepKind};

use crate::error::ClientError;

/// What the orchestrator needs from the broker.
///
/// Tests substitute an in-process implementation.
#[async_trait]
pub trait BrokerHandle: Send + Sync {
    /// Establishes or resets the broker's grid state.
    async fn transfer(&self, generation: Generation) -> Result<(), ClientError>;

    /// Runs one turn and returns the merged next generation plus the
    /// flipped cells.
    async fn step(
        &self,
        workers: &[String],
        kind: StepKind,
    ) -> Result<(Generation, Vec<Cell>), ClientError>;

    /// Broadcasts shutdown to the fleet via the broker; returns how many
    /// workers were notified.
    async fn kill_fleet(&self, workers: &[String]) -> Result<usize, ClientError>;
}

/// TCP handle reusing one framed connection for the whole run.
pub struct TcpBroker {
    framed: Mutex<Framed<TcpStream, BrokerClientCodec>>,
}

impl TcpBroker {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        debug!(addr, "dialing broker");
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(Self {
            framed: Mutex::new(Framed::new(stream, BrokerClientCodec::new())),
        })
    }

    async fn round_trip(&self, request: BrokerRequest) -> Result<BrokerResponse, ClientError> {
        let mut framed = self.framed.lock().await;
        framed.send(request).await?;
        match framed.next().await {
            Some(Ok(response)) => Ok(response),
            Some(Err(e)) => Err(ClientError::Codec(e)),
            None => Err(ClientError::Connection(
                "broker closed the connection".to_string(),
            )),
        }
    }
}

#[async_trait]
impl BrokerHandle for TcpBroker {
    async fn transfer(&self, generation: Generation) -> Result<(), ClientError> {
        match self.round_trip(BrokerRequest::Transfer { generation }).await? {
            BrokerResponse::TransferAck => Ok(()),
            BrokerResponse::Error { message } => Err(ClientError::Remote(message)),
            other => Err(ClientError::Remote(format!(
                "unexpected response to transfer: {other:?}"
            ))),
        }
    }

    async fn step(
        &self,
        workers: &[String],
        kind: StepKind,
    ) -> Result<(Generation, Vec<Cell>), ClientError> {
        let request = BrokerRequest::Step {
            workers: workers.to_vec(),
            kind,
        };
        match self.round_trip(request).await? {
            BrokerResponse::Step { generation, flipped } => Ok((generation, flipped)),
            BrokerResponse::Error { message } => Err(ClientError::Remote(message)),
            other => Err(ClientError::Remote(format!(
                "unexpected response to step: {other:?}"
            ))),
        }
    }

    async fn kill_fleet(&self, workers: &[String]) -> Result<usize, ClientError> {
        let request = BrokerRequest::KillFleet {
            workers: workers.to_vec(),
        };
        match self.round_trip(request).await? {
            BrokerResponse::KillFleetAck { notified } => Ok(notified),
            BrokerResponse::Error { message } => Err(ClientError::Remote(message)),
            other => Err(ClientError::Remote(format!(
                "unexpected response to kill-fleet: {other:?}"
            ))),
        }
    }
}
