//! Turn coordination for the colony cluster.
//!
//! The broker owns the current generation. Each turn it partitions the
//! grid into row bands, fans one step call per worker out through the
//! gateway, joins all of them, reassembles the next generation in
//! partition order, and publishes it - or aborts the turn leaving the
//! stored generation untouched.

pub mod error;
pub mod gateway;
pub mod partition;
pub mod service;

pub use error::TurnError;
pub use gateway::{TcpWorkerGateway, WorkerGateway};
pub use service::Broker;
