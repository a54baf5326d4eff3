//! Run-state and progress events emitted by the orchestrator.

use std::fmt;

use colony_core::Cell;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Orchestrator lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Quitting,
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "running"),
            RunState::Paused => write!(f, "paused"),
            RunState::Quitting => write!(f, "quitting"),
            RunState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Progress notifications: an ordered, one-directional stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CellChanged { turn: usize, cell: Cell },
    TurnComplete { turn: usize },
    AliveCount { turn: usize, count: usize },
    StateChanged { turn: usize, state: RunState },
    SnapshotComplete { turn: usize, key: String },
    FinalComplete { turn: usize, alive: Vec<Cell> },
}

/// Sending half of the event stream.
///
/// Dropping the sink closes the stream, which is how observers learn that
/// no further events follow.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emits one event. A departed observer does not stop the run; the
    /// send result is discarded.
    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

/// Logs events until the stream closes. Stands in for an attached UI.
pub async fn log_events(mut rx: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::CellChanged { turn, cell } => trace!(turn, %cell, "cell changed"),
            Event::TurnComplete { turn } => debug!(turn, "turn complete"),
            Event::AliveCount { turn, count } => info!(turn, count, "alive cells"),
            Event::StateChanged { turn, state } => info!(turn, %state, "state changed"),
            Event::SnapshotComplete { turn, key } => info!(turn, key = %key, "snapshot complete"),
            Event::FinalComplete { turn, alive } => {
                info!(turn, alive = alive.len(), "final turn complete");
            }
        }
    }
}
