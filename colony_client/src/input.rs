//! Keyboard command source.

use std::time::Duration;

use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal;
use tokio::sync::mpsc;
use tracing::warn;

/// User commands driving the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Persist the current generation.
    Snapshot,
    /// Toggle the paused state.
    Pause,
    /// Stop the run early.
    Quit,
    /// Tear the worker fleet down and stop.
    KillFleet,
}

/// Spawns a raw-mode key reader feeding `tx`.
///
/// s = snapshot, p = pause/resume, q = quit, k = kill fleet.
pub fn spawn_key_reader(tx: mpsc::UnboundedSender<Command>) {
    std::thread::spawn(move || {
        if let Err(e) = terminal::enable_raw_mode() {
            warn!(error = %e, "raw mode unavailable, keyboard commands disabled");
            return;
        }
        read_keys(&tx);
        let _ = terminal::disable_raw_mode();
    });
}

fn read_keys(tx: &mpsc::UnboundedSender<Command>) {
    loop {
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {
                let Ok(TermEvent::Key(KeyEvent {
                    code,
                    kind: KeyEventKind::Press,
                    ..
                })) = event::read()
                else {
                    continue;
                };
                let command = match code {
                    KeyCode::Char('s') => Command::Snapshot,
                    KeyCode::Char('p') => Command::Pause,
                    KeyCode::Char('q') => Command::Quit,
                    KeyCode::Char('k') => Command::KillFleet,
                    _ => continue,
                };
                if tx.send(command).is_err() {
                    return;
                }
            }
            Ok(false) => {
                if tx.is_closed() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "keyboard read failed");
                return;
            }
        }
    }
}
