//! Step service: computes one partition's next state per request.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use colony_core::codec::{CodecError, WorkerServerCodec};
use colony_core::wire::{StepRequest, StepResponse, WorkerRequest, WorkerResponse};

/// Applies the requested stepper to the request's partition.
pub fn compute_step(request: StepRequest) -> StepResponse {
    let (rows, flipped) = request
        .kind
        .stepper()
        .step_band(&request.generation, &request.range);
    StepResponse { rows, flipped }
}

/// Accept loop. Resolves once a shutdown request arrives on any
/// connection.
pub async fn serve(listener: TcpListener, shutdown: Arc<Notify>) -> std::io::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                debug!(%peer, "broker connected");
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move {
                    if let Err(e) = handle_conn(stream, shutdown).await {
                        warn!(%peer, error = %e, "connection ended with error");
                    }
                });
            }
            _ = shutdown.notified() => {
                info!("shutdown requested, stopping accept loop");
                return Ok(());
            }
        }
    }
}

async fn handle_conn<S>(stream: S, shutdown: Arc<Notify>) -> Result<(), CodecError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, WorkerServerCodec::new());
    while let Some(request) = framed.next().await {
        match request {
            Ok(WorkerRequest::Step(request)) => {
                let rows = request.range.rows();
                let response = compute_step(request);
                debug!(rows, flipped = response.flipped.len(), "band stepped");
                framed.send(WorkerResponse::Step(response)).await?;
            }
            Ok(WorkerRequest::Shutdown) => {
                info!("fleet shutdown received");
                shutdown.notify_one();
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "malformed request");
                framed
                    .send(WorkerResponse::Error {
                        message: e.to_string(),
                    })
                    .await?;
                return Ok(());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use colony_core::codec::WorkerClientCodec;
    use colony_core::{rules, Generation, PartitionRange, StepKind, ALIVE};

    use super::*;

    fn blinker_5x5() -> Generation {
        let mut generation = Generation::blank(5, 5);
        for y in 1..4 {
            generation.set(2, y, ALIVE);
        }
        generation
    }

    #[test]
    fn compute_step_matches_reference_band() {
        let generation = blinker_5x5();
        let range = PartitionRange {
            start_row: 1,
            end_row: 3,
            start_col: 0,
            end_col: 5,
        };
        let request = StepRequest {
            range,
            generation: generation.clone(),
            kind: StepKind::Conway,
        };

        let response = compute_step(request);
        let (reference, _) = rules::step_whole(&generation);
        assert_eq!(response.rows, reference.row_bytes(1, 3));
    }

    #[tokio::test]
    async fn connection_serves_steps_then_honours_shutdown() {
        let (client_side, server_side) = tokio::io::duplex(1024 * 1024);
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(handle_conn(server_side, Arc::clone(&shutdown)));

        let mut client = Framed::new(client_side, WorkerClientCodec::new());
        let generation = blinker_5x5();
        let request = StepRequest {
            range: PartitionRange::whole(5, 5),
            generation: generation.clone(),
            kind: StepKind::Identity,
        };

        client.send(WorkerRequest::Step(request)).await.unwrap();
        match client.next().await.unwrap().unwrap() {
            WorkerResponse::Step(response) => {
                assert_eq!(response.rows, generation.as_bytes());
                assert!(response.flipped.is_empty());
            }
            WorkerResponse::Error { message } => panic!("unexpected error: {message}"),
        }

        client.send(WorkerRequest::Shutdown).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), shutdown.notified())
            .await
            .expect("shutdown was not signalled");
        server.await.unwrap().unwrap();
    }
}
