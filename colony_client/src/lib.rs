//! Client-side orchestration for the colony cluster.
//!
//! The orchestrator drives successive broker turns, arbitrating each
//! cycle between the alive-count timer and a single pending user command,
//! and reports progress through a one-way event stream.

pub mod broker;
pub mod error;
pub mod events;
pub mod input;
pub mod io;
pub mod orchestrator;

pub use broker::{BrokerHandle, TcpBroker};
pub use error::ClientError;
pub use events::{Event, EventSink, RunState};
pub use input::Command;
pub use io::{FileIo, IoGateway};
pub use orchestrator::{Orchestrator, RunConfig, RunSummary};
