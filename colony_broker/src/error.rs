//! Turn-level failure kinds surfaced to the client.

use colony_core::codec::CodecError;
use colony_core::GridError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TurnError {
    /// A worker could not be reached or its connection broke mid-call.
    #[error("failed to reach worker {addr}: {message}")]
    Connection { addr: String, message: String },

    /// A worker answered with an error instead of a step result.
    #[error("worker {addr} rejected the call: {message}")]
    RemoteCall { addr: String, message: String },

    /// Reassembled band rows do not add up to the full grid. Always a
    /// programming error, never masked by padding or truncating.
    #[error("merged {actual} rows, expected {expected}")]
    PartitionMismatch { expected: usize, actual: usize },

    /// A step arrived before any grid transfer.
    #[error("no grid transferred before step")]
    NotInitialised,

    /// A step arrived with an empty worker list.
    #[error("step requested with an empty worker list")]
    NoWorkers,

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
