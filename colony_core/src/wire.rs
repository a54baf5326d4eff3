//! Request/response contracts for the broker and worker links.

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Generation, PartitionRange};
use crate::stepper::StepKind;

/// One worker's share of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    /// Partition this worker is responsible for.
    pub range: PartitionRange,
    /// Full current generation. Boundary rows of the partition read
    /// neighbours outside the band, so the whole grid travels.
    pub generation: Generation,
    /// Stepper implementation to apply.
    pub kind: StepKind,
}

/// A worker's computed share of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResponse {
    /// Next-state bytes for the requested range, row-major.
    pub rows: Vec<u8>,
    /// Cells inside the range whose state changed, absolute coordinates.
    pub flipped: Vec<Cell>,
}

/// Messages the broker sends to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkerRequest {
    Step(StepRequest),
    /// Terminate the worker process. Carries no payload and receives no
    /// response.
    Shutdown,
}

/// Messages a worker sends back to the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerResponse {
    Step(StepResponse),
    Error { message: String },
}

/// Messages a client sends to the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BrokerRequest {
    /// Establishes or resets the broker's grid state. Must precede any
    /// `Step`. Overwrites prior state unconditionally.
    Transfer { generation: Generation },
    /// Runs one full turn against the given worker fleet, in partition
    /// order.
    Step { workers: Vec<String>, kind: StepKind },
    /// Broadcasts shutdown to the fleet. Send-only; worker exits are not
    /// awaited.
    KillFleet { workers: Vec<String> },
}

/// Broker replies to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BrokerResponse {
    TransferAck,
    Step {
        generation: Generation,
        flipped: Vec<Cell>,
    },
    KillFleetAck {
        notified: usize,
    },
    Error {
        message: String,
    },
}
