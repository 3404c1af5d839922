//! Lifecycle bookkeeping of one watcher.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Lifecycle phase of an account watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No session is open.
    Disconnected,
    /// Opening the watching session.
    Connecting,
    /// Entering IDLE on a fresh session.
    NotifyEnter,
    /// Idling and polling for updates.
    NotifyWait,
    /// Replacing a session that reached its maximum age.
    Reconnecting,
    /// Waiting after a failure.
    ErrorBackoff,
    /// Terminal.
    Stopped,
}

impl Phase {
    /// Returns a short lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::NotifyEnter => "notify-enter",
            Self::NotifyWait => "notify-wait",
            Self::Reconnecting => "reconnecting",
            Self::ErrorBackoff => "error-backoff",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state owned by a running watcher.
#[derive(Debug)]
pub struct WatcherState {
    phase: Phase,
    connected_at: Option<Instant>,
    consecutive_errors: u32,
}

impl WatcherState {
    /// Creates the initial, disconnected state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Disconnected,
            connected_at: None,
            consecutive_errors: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Moves to another phase. `Stopped` is final.
    pub fn transition(&mut self, next: Phase) {
        if self.phase == Phase::Stopped || self.phase == next {
            return;
        }
        debug!(from = %self.phase, to = %next, "phase change");
        if next != Phase::NotifyWait {
            self.connected_at = None;
        }
        self.phase = next;
    }

    /// Records that IDLE was entered now.
    pub fn mark_connected(&mut self) {
        self.connected_at = Some(Instant::now());
    }

    /// Time since IDLE was entered, zero when not idling.
    #[must_use]
    pub fn connection_age(&self) -> Duration {
        self.connected_at.map_or(Duration::ZERO, |at| at.elapsed())
    }

    /// Counts one more failure and returns the new count.
    pub const fn record_error(&mut self) -> u32 {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.consecutive_errors
    }

    /// Clears the failure count after a good cycle.
    pub const fn reset_errors(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Failures since the last good cycle.
    #[must_use]
    pub const fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }
}

impl Default for WatcherState {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary returned when a watcher task ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherReport {
    /// Account name.
    pub account: String,
    /// Phase the watcher ended in.
    pub phase: Phase,
    /// Failures since the last good cycle.
    pub consecutive_errors: u32,
    /// Failures over the whole run.
    pub total_errors: u64,
    /// Watching sessions that were opened.
    pub connections: u64,
    /// New messages handed to the handler.
    pub new_messages: u64,
}
