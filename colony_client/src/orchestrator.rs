//! Client-side turn loop: drives the broker, arbitrates the alive-count
//! timer against user commands, and reports progress through the event
//! sink.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use colony_core::{Generation, SimParams, StepKind};

use crate::broker::BrokerHandle;
use crate::error::ClientError;
use crate::events::{Event, EventSink, RunState};
use crate::input::Command;
use crate::io::IoGateway;

/// How many times one turn is attempted before the run gives up.
const TURN_ATTEMPTS: usize = 3;

/// Configuration of one orchestrated run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub params: SimParams,
    /// Worker addresses in partition order.
    pub workers: Vec<String>,
    pub kind: StepKind,
    /// Wall-time interval between alive-count reports.
    pub poll_interval: Duration,
}

/// What a finished run looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub turns: usize,
    pub alive: usize,
}

/// The stimulus observed by one cycle's non-blocking check.
enum Stimulus {
    Timer,
    Command(Command),
}

/// Drives the turn loop against a broker.
///
/// State machine over Running/Paused/Quitting/Stopped; initial Running,
/// terminal Stopped. The orchestrator only ever holds the most recently
/// returned generation - the broker owns the authoritative state.
pub struct Orchestrator<B, I> {
    config: RunConfig,
    broker: B,
    io: I,
    events: EventSink,
    commands: mpsc::UnboundedReceiver<Command>,
    state: RunState,
    turn: usize,
    world: Generation,
    next_poll: Instant,
}

impl<B: BrokerHandle, I: IoGateway> Orchestrator<B, I> {
    pub fn new(
        config: RunConfig,
        broker: B,
        io: I,
        events: EventSink,
        commands: mpsc::UnboundedReceiver<Command>,
        seed: Generation,
    ) -> Self {
        let next_poll = Instant::now() + config.poll_interval;
        Self {
            config,
            broker,
            io,
            events,
            commands,
            state: RunState::Running,
            turn: 0,
            world: seed,
            next_poll,
        }
    }

    /// Runs the turn loop to completion.
    ///
    /// The finish path - final snapshot, io idle barrier, summary event,
    /// sink close - runs whether the loop ended normally or fatally.
    pub async fn run(mut self) -> Result<RunSummary, ClientError> {
        for cell in self.world.alive_cells() {
            self.events.emit(Event::CellChanged { turn: 0, cell });
        }

        let outcome = self.drive().await;
        if let Err(e) = &outcome {
            warn!(error = %e, "run aborted, flushing best-effort snapshot");
        }

        self.snapshot().await;
        self.io.await_idle().await;
        let alive = self.world.alive_cells();
        let summary = RunSummary {
            turns: self.turn,
            alive: alive.len(),
        };
        self.events.emit(Event::FinalComplete {
            turn: self.turn,
            alive,
        });
        info!(turns = summary.turns, alive = summary.alive, "run finished");

        // Dropping self closes the event sink.
        outcome.map(|()| summary)
    }

    async fn drive(&mut self) -> Result<(), ClientError> {
        self.broker.transfer(self.world.clone()).await?;

        while self.turn < self.config.params.turns && self.state != RunState::Stopped {
            self.advance_turn().await?;
            match self.poll_stimulus() {
                Some(Stimulus::Timer) => {
                    self.events.emit(Event::AliveCount {
                        turn: self.turn,
                        count: self.world.alive_count(),
                    });
                }
                Some(Stimulus::Command(command)) => self.handle_command(command).await,
                None => {}
            }
        }
        Ok(())
    }

    /// One broker step with bounded retries; publishes events on success.
    async fn advance_turn(&mut self) -> Result<(), ClientError> {
        let mut attempt = 0;
        let (generation, flipped) = loop {
            attempt += 1;
            match self.broker.step(&self.config.workers, self.config.kind).await {
                Ok(result) => break result,
                Err(e) if attempt < TURN_ATTEMPTS => {
                    warn!(turn = self.turn, attempt, error = %e, "turn failed, retrying");
                }
                Err(e) => {
                    return Err(ClientError::TurnFailed {
                        turn: self.turn,
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        };

        self.world = generation;
        for cell in flipped {
            self.events.emit(Event::CellChanged {
                turn: self.turn,
                cell,
            });
        }
        self.events.emit(Event::TurnComplete { turn: self.turn });
        self.turn += 1;
        Ok(())
    }

    /// Exactly one non-blocking check per cycle: the timer if its
    /// deadline passed, else one queued command, never both.
    fn poll_stimulus(&mut self) -> Option<Stimulus> {
        let now = Instant::now();
        if now >= self.next_poll {
            self.next_poll = now + self.config.poll_interval;
            return Some(Stimulus::Timer);
        }
        match self.commands.try_recv() {
            Ok(command) => Some(Stimulus::Command(command)),
            Err(_) => None,
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Snapshot => {
                self.events.emit(Event::StateChanged {
                    turn: self.turn,
                    state: self.state,
                });
                self.snapshot().await;
            }
            Command::Pause => self.pause().await,
            Command::Quit => {
                self.state = RunState::Quitting;
                self.events.emit(Event::StateChanged {
                    turn: self.turn,
                    state: RunState::Quitting,
                });
                self.snapshot().await;
                self.events.emit(Event::TurnComplete { turn: self.turn });
                self.state = RunState::Stopped;
            }
            Command::KillFleet => {
                self.snapshot().await;
                match self.broker.kill_fleet(&self.config.workers).await {
                    Ok(notified) => info!(notified, "fleet shutdown broadcast"),
                    Err(e) => warn!(error = %e, "fleet shutdown broadcast failed"),
                }
                // A torn-down fleet cannot serve further turns.
                self.state = RunState::Stopped;
            }
        }
    }

    /// Blocking sub-phase: discards every command except the pause
    /// toggle. No turns and no timer events while paused.
    async fn pause(&mut self) {
        self.state = RunState::Paused;
        self.events.emit(Event::StateChanged {
            turn: self.turn,
            state: RunState::Paused,
        });
        self.snapshot().await;
        info!(turn = self.turn, "paused");

        loop {
            match self.commands.recv().await {
                Some(Command::Pause) => break,
                Some(other) => debug!(?other, "ignored while paused"),
                None => {
                    // The command source is gone; nothing can resume us.
                    self.state = RunState::Stopped;
                    return;
                }
            }
        }

        self.state = RunState::Running;
        self.events.emit(Event::StateChanged {
            turn: self.turn,
            state: RunState::Running,
        });
        self.events.emit(Event::TurnComplete { turn: self.turn });
        self.next_poll = Instant::now() + self.config.poll_interval;
        info!(turn = self.turn, "resumed");
    }

    /// Persists the current generation keyed by dimensions and turn.
    async fn snapshot(&mut self) {
        let key = snapshot_key(&self.config.params, self.turn);
        match self.io.save(&key, self.world.clone()).await {
            Ok(()) => self.events.emit(Event::SnapshotComplete {
                turn: self.turn,
                key,
            }),
            Err(e) => warn!(key = %key, error = %e, "snapshot failed"),
        }
    }
}

/// `"{width}x{height}x{turn}"` - the input key scheme extended with the
/// turn the snapshot was taken at.
pub fn snapshot_key(params: &SimParams, turn: usize) -> String {
    format!("{}x{}x{}", params.width, params.height, turn)
}

/// `"{width}x{height}"` - the key input images are stored under.
pub fn input_key(params: &SimParams) -> String {
    format!("{}x{}", params.width, params.height)
}
