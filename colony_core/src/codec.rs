//! Length-delimited JSON framing for the cluster's TCP links.

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::wire::{BrokerRequest, BrokerResponse, WorkerRequest, WorkerResponse};

/// Upper bound on a single frame. A generation serialized as JSON costs a
/// few bytes per cell, so this covers grids well past a thousand rows.
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame transport failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame payload was not valid JSON: {0}")]
    Json(serde_json::Error),
}

/// Serializes `Tx` frames out and deserializes `Rx` frames in.
///
/// Each side of a link instantiates the codec with its own orientation;
/// see the aliases below.
#[derive(Debug)]
pub struct JsonCodec<Tx, Rx> {
    length: LengthDelimitedCodec,
    _frames: PhantomData<fn(Tx) -> Rx>,
}

impl<Tx, Rx> JsonCodec<Tx, Rx> {
    pub fn new() -> Self {
        Self {
            length: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_BYTES)
                .new_codec(),
            _frames: PhantomData,
        }
    }
}

impl<Tx, Rx> Default for JsonCodec<Tx, Rx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tx, Rx: DeserializeOwned> Decoder for JsonCodec<Tx, Rx> {
    type Item = Rx;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.length.decode(src)? else {
            return Ok(None);
        };

        serde_json::from_slice(&frame)
            .map(Some)
            .map_err(CodecError::Json)
    }
}

impl<Tx: Serialize, Rx> Encoder<Tx> for JsonCodec<Tx, Rx> {
    type Error = CodecError;

    fn encode(&mut self, item: Tx, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(CodecError::Json)?;

        self.length
            .encode(Bytes::from(json), dst)
            .map_err(CodecError::Io)
    }
}

/// Client side of the client↔broker link.
pub type BrokerClientCodec = JsonCodec<BrokerRequest, BrokerResponse>;
/// Broker side of the client↔broker link.
pub type BrokerServerCodec = JsonCodec<BrokerResponse, BrokerRequest>;
/// Broker side of the broker↔worker link.
pub type WorkerClientCodec = JsonCodec<WorkerRequest, WorkerResponse>;
/// Worker side of the broker↔worker link.
pub type WorkerServerCodec = JsonCodec<WorkerResponse, WorkerRequest>;

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use tokio_test::io::Builder;
    use tokio_util::codec::FramedRead;

    use super::*;
    use crate::grid::Generation;
    use crate::stepper::StepKind;

    #[test]
    fn frames_encode_and_decode_in_order() {
        let transfer = BrokerRequest::Transfer {
            generation: Generation::blank(4, 4),
        };
        let step = BrokerRequest::Step {
            workers: vec!["127.0.0.1:8040".to_string()],
            kind: StepKind::Conway,
        };

        let mut buffer = BytesMut::new();
        let mut encoder: BrokerClientCodec = JsonCodec::new();
        encoder.encode(transfer, &mut buffer).unwrap();
        encoder.encode(step, &mut buffer).unwrap();

        let mut decoder: BrokerServerCodec = JsonCodec::new();
        let first = decoder.decode(&mut buffer).unwrap();
        assert!(matches!(first, Some(BrokerRequest::Transfer { .. })));

        let second = decoder.decode(&mut buffer).unwrap();
        match second {
            Some(BrokerRequest::Step { workers, kind }) => {
                assert_eq!(workers, vec!["127.0.0.1:8040".to_string()]);
                assert_eq!(kind, StepKind::Conway);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn framed_stream_yields_each_frame() {
        let ack = BrokerResponse::TransferAck;
        let error = BrokerResponse::Error {
            message: "no grid transferred before step".to_string(),
        };

        let mut buffer = BytesMut::new();
        let mut encoder: BrokerServerCodec = JsonCodec::new();
        encoder.encode(ack, &mut buffer).unwrap();
        encoder.encode(error, &mut buffer).unwrap();

        let mut stream = Builder::new().read(&buffer.freeze()).build();
        let mut framed = FramedRead::new(&mut stream, BrokerClientCodec::new());

        assert!(matches!(
            framed.next().await.unwrap().unwrap(),
            BrokerResponse::TransferAck
        ));
        assert!(matches!(
            framed.next().await.unwrap().unwrap(),
            BrokerResponse::Error { .. }
        ));
        assert!(framed.next().await.is_none());
    }
}
