//! Shared model and wire protocol for the colony cluster.
//!
//! A colony run is three cooperating roles:
//! - a **broker** that owns the current generation and fans each turn out
//!   across a fixed worker fleet,
//! - **workers** that each compute the next state for one partition,
//! - a **client** orchestrator that drives the turn cadence and reacts to
//!   user commands.
//!
//! This crate holds everything those roles agree on: the grid model, the
//! Conway kernel, the stepper capability trait, and the framed JSON wire
//! contracts.

pub mod codec;
pub mod error;
pub mod grid;
pub mod rules;
pub mod stepper;
pub mod wire;

pub use error::GridError;
pub use grid::{Cell, Generation, PartitionRange, SimParams, ALIVE, DEAD};
pub use stepper::{GridStepper, StepKind};
