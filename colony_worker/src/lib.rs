//! Partition step worker for the colony cluster.
//!
//! A worker is a small TCP service: the broker sends it one partition of
//! the grid per turn, it applies the requested stepper and replies with
//! the partition's next state. A shutdown request terminates the process.

pub mod service;

pub use service::{compute_step, serve};
