//! Client-side failure kinds.

use colony_core::codec::CodecError;
use colony_core::GridError;
use thiserror::Error;

use crate::io::IoError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The broker could not be reached or the connection broke.
    #[error("failed to reach broker: {0}")]
    Connection(String),

    /// The broker answered with an error instead of a result.
    #[error("broker rejected the request: {0}")]
    Remote(String),

    /// A turn kept failing past the retry limit.
    #[error("turn {turn} failed after {attempts} attempts: {message}")]
    TurnFailed {
        turn: usize,
        attempts: usize,
        message: String,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Io(#[from] IoError),
}
