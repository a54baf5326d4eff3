//! Errors shared across the cluster roles.

use thiserror::Error;

/// Violations of the grid data model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// A cell byte was neither alive (255) nor dead (0). Undefined values
    /// are rejected, never propagated.
    #[error("cell byte {value} at ({x}, {y}) is neither alive (255) nor dead (0)")]
    BadCellByte { x: usize, y: usize, value: u8 },

    /// The byte count does not match the declared dimensions.
    #[error("expected {expected} cell bytes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Width or height of zero.
    #[error("grid dimensions must be non-zero")]
    ZeroDimension,
}
