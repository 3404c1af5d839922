//! Account watcher.
//!
//! One watcher per account keeps a read-only session in IDLE, replaces it on
//! a fixed schedule and after failures, and hands every newly arrived message
//! to a [`MessageHandler`].
//!
//! ```text
//! Disconnected ─→ Connecting ─→ NotifyEnter ─→ NotifyWait ──┐ poll
//!      ↑              │              │         │   │  ↑   │
//!      │              └──────┬───────┘         │   │  └───┘
//!      │                     ↓                 │   ↓
//!      ├──────────────  ErrorBackoff ←─────────┘  Reconnecting
//!      │                     │                     │
//!      └─────────────────────┼─────────────────────┘
//!                            ↓
//!                         Stopped
//! ```
//!
//! Envelopes are fetched over a second, short-lived session so the idling
//! one is never disturbed. That session never enters IDLE.

mod detect;
mod state;
#[cfg(test)]
mod tests;

use std::ops::ControlFlow;
use std::sync::Arc;

use mailhook_imap::RawEnvelope;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use detect::detect_new_message;
pub use state::{Phase, WatcherReport, WatcherState};

use crate::account::AccountConfig;
use crate::callback::MessageHandler;
use crate::envelope::summarize;
use crate::settings::WatcherSettings;
use crate::transport::{NotifySession, Transport};

/// Why the watching session was given up.
#[derive(Debug)]
enum SessionEnd {
    /// The session reached its maximum age.
    Reconnect,
    /// A stop was requested.
    Stop,
    /// Entering or polling IDLE failed.
    Failed(mailhook_imap::Error),
}

/// Watches one account until stopped.
pub struct AccountWatcher<T, H> {
    account: Arc<AccountConfig>,
    settings: WatcherSettings,
    transport: T,
    handler: H,
    cancel: CancellationToken,
    state: WatcherState,
    total_errors: u64,
    connections: u64,
    new_messages: u64,
}

impl<T, H> AccountWatcher<T, H>
where
    T: Transport,
    H: MessageHandler,
{
    /// Creates a watcher. It stops once `cancel` is cancelled.
    #[must_use]
    pub const fn new(
        account: Arc<AccountConfig>,
        settings: WatcherSettings,
        transport: T,
        handler: H,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            account,
            settings,
            transport,
            handler,
            cancel,
            state: WatcherState::new(),
            total_errors: 0,
            connections: 0,
            new_messages: 0,
        }
    }

    /// Runs until stopped or until the error limit is reached.
    ///
    /// Never fails: every error ends in a backoff and a new attempt.
    pub async fn run(mut self) -> WatcherReport {
        info!(
            host = %self.account.server.host,
            folder = %self.account.folder,
            "watcher started"
        );

        while !self.cancel.is_cancelled() {
            self.state.transition(Phase::Connecting);
            let mut session = match self.transport.open(&self.account).await {
                Ok(session) => session,
                Err(err) => {
                    error!(kind = %err.kind(), error = %err, "connection failed");
                    if self.backoff().await.is_break() {
                        break;
                    }
                    continue;
                }
            };
            self.connections += 1;
            info!("connected");

            let end = self.watch(&mut session).await;
            session.release().await;
            debug!("session released");

            match end {
                SessionEnd::Reconnect => self.state.transition(Phase::Disconnected),
                SessionEnd::Stop => break,
                SessionEnd::Failed(err) => {
                    error!(kind = %err.kind(), error = %err, "IDLE failed");
                    if self.backoff().await.is_break() {
                        break;
                    }
                }
            }
        }

        self.state.transition(Phase::Stopped);
        info!(errors = self.total_errors, messages = self.new_messages, "watcher stopped");
        self.report()
    }

    /// Idles on `session` until it has to be given up.
    async fn watch(&mut self, session: &mut T::Session) -> SessionEnd {
        self.state.transition(Phase::NotifyEnter);
        if let Err(err) = session.enter_notify().await {
            return SessionEnd::Failed(err);
        }
        self.state.mark_connected();
        self.state.transition(Phase::NotifyWait);
        info!("waiting for new messages");

        loop {
            if self.cancel.is_cancelled() {
                return SessionEnd::Stop;
            }
            if self.settings.reconnect_due(self.state.connection_age()) {
                info!("enforcing reconnection");
                self.state.transition(Phase::Reconnecting);
                return SessionEnd::Reconnect;
            }

            let updates = match session.wait_for_updates(self.settings.poll_timeout).await {
                Ok(updates) => updates,
                Err(err) => return SessionEnd::Failed(err),
            };
            if !updates.is_empty() {
                let received: Vec<String> = updates.iter().map(ToString::to_string).collect();
                debug!(?received, "server updates");
            }

            // Sequence numbers start at 1.
            if let Some(number) = detect_new_message(&updates).filter(|n| *n > 0) {
                self.handle_new_message(number).await;
            }
            self.state.reset_errors();
        }
    }

    async fn handle_new_message(&mut self, number: u32) {
        info!(number, "new message");
        let Some(raw) = self.fetch_envelope(number).await else {
            return;
        };

        let summary = summarize(&raw);
        self.new_messages += 1;
        if let Err(err) = self.handler.on_new_message(&summary) {
            warn!(number, error = %err, "message not handled");
        }
    }

    /// Fetches one envelope over a separate session.
    async fn fetch_envelope(&self, number: u32) -> Option<RawEnvelope> {
        let mut session = match self.transport.open(&self.account).await {
            Ok(session) => session,
            Err(err) => {
                error!(number, error = %err, "separate connection for fetching failed");
                return None;
            }
        };

        let result = session.fetch_envelope(number).await;
        session.release().await;

        match result {
            Ok(Some(envelope)) => Some(envelope),
            Ok(None) => {
                info!(number, "no envelope for message");
                None
            }
            Err(err) => {
                error!(number, error = %err, "fetching envelope failed");
                None
            }
        }
    }

    /// Counts a failure and waits. Breaks when the watcher must stop.
    async fn backoff(&mut self) -> ControlFlow<()> {
        self.total_errors += 1;
        let errors = self.state.record_error();
        self.state.transition(Phase::ErrorBackoff);

        if self.settings.error_limit_reached(errors) {
            error!(errors, "giving up after too many consecutive errors");
            return ControlFlow::Break(());
        }

        debug!(errors, backoff = ?self.settings.error_backoff, "waiting before reconnecting");
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => ControlFlow::Break(()),
            () = tokio::time::sleep(self.settings.error_backoff) => {
                self.state.transition(Phase::Disconnected);
                ControlFlow::Continue(())
            }
        }
    }

    fn report(&self) -> WatcherReport {
        WatcherReport {
            account: self.account.name.clone(),
            phase: self.state.phase(),
            consecutive_errors: self.state.consecutive_errors(),
            total_errors: self.total_errors,
            connections: self.connections,
            new_messages: self.new_messages,
        }
    }
}

impl<T, H> std::fmt::Debug for AccountWatcher<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountWatcher")
            .field("account", &self.account.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
