//! Remote-call plumbing between the broker and its worker fleet.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::debug;

use colony_core::codec::WorkerClientCodec;
use colony_core::wire::{StepRequest, StepResponse, WorkerRequest, WorkerResponse};

use crate::error::TurnError;

/// Invokes remote operations on a worker address.
///
/// The broker's dispatch logic only sees this trait; tests substitute an
/// in-process fleet.
#[async_trait]
pub trait WorkerGateway: Send + Sync + 'static {
    /// Runs one step call against `addr` and returns the computed band.
    async fn step(&self, addr: &str, request: StepRequest) -> Result<StepResponse, TurnError>;

    /// Asks the worker at `addr` to terminate. Send-only: the worker's
    /// exit is not awaited and no response arrives.
    async fn shutdown(&self, addr: &str) -> Result<(), TurnError>;
}

type WorkerConn = Framed<TcpStream, WorkerClientCodec>;

/// TCP gateway keeping one persistent connection per worker address
/// across turns.
///
/// A connection is checked out for the duration of a call and returned on
/// success; any transport error drops it, so the next call re-dials.
pub struct TcpWorkerGateway {
    pool: Mutex<HashMap<String, WorkerConn>>,
}

impl TcpWorkerGateway {
    pub fn new() -> Self {
        Self {
            pool: Mutex::new(HashMap::new()),
        }
    }

    async fn checkout(&self, addr: &str) -> Result<WorkerConn, TurnError> {
        if let Some(conn) = self.pool.lock().await.remove(addr) {
            return Ok(conn);
        }
        debug!(addr, "dialing worker");
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TurnError::Connection {
                addr: addr.to_string(),
                message: e.to_string(),
            })?;
        Ok(Framed::new(stream, WorkerClientCodec::new()))
    }

    async fn check_in(&self, addr: &str, conn: WorkerConn) {
        let _ = self.pool.lock().await.insert(addr.to_string(), conn);
    }
}

impl Default for TcpWorkerGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerGateway for TcpWorkerGateway {
    async fn step(&self, addr: &str, request: StepRequest) -> Result<StepResponse, TurnError> {
        let mut conn = self.checkout(addr).await?;

        if let Err(e) = conn.send(WorkerRequest::Step(request)).await {
            return Err(TurnError::Connection {
                addr: addr.to_string(),
                message: e.to_string(),
            });
        }

        match conn.next().await {
            Some(Ok(WorkerResponse::Step(response))) => {
                self.check_in(addr, conn).await;
                Ok(response)
            }
            Some(Ok(WorkerResponse::Error { message })) => {
                self.check_in(addr, conn).await;
                Err(TurnError::RemoteCall {
                    addr: addr.to_string(),
                    message,
                })
            }
            Some(Err(e)) => Err(TurnError::Connection {
                addr: addr.to_string(),
                message: e.to_string(),
            }),
            None => Err(TurnError::Connection {
                addr: addr.to_string(),
                message: "connection closed before response".to_string(),
            }),
        }
    }

    async fn shutdown(&self, addr: &str) -> Result<(), TurnError> {
        let mut conn = self.checkout(addr).await?;
        // The worker exits without replying; the connection is spent.
        conn.send(WorkerRequest::Shutdown)
            .await
            .map_err(|e| TurnError::Connection {
                addr: addr.to_string(),
                message: e.to_string(),
            })
    }
}
