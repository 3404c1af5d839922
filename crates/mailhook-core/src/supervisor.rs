//! Runs one watcher task per account.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};

use crate::account::AccountConfig;
use crate::callback::CallbackDispatcher;
use crate::settings::WatcherSettings;
use crate::transport::Transport;
use crate::watcher::{AccountWatcher, WatcherReport};

/// Owns the watcher tasks and stops them together.
#[derive(Debug)]
pub struct Supervisor<T> {
    transport: T,
    settings: WatcherSettings,
    cancel: CancellationToken,
    tasks: JoinSet<WatcherReport>,
}

impl<T> Supervisor<T>
where
    T: Transport + Clone,
{
    /// Creates a supervisor with no watchers.
    #[must_use]
    pub fn new(transport: T, settings: WatcherSettings) -> Self {
        Self {
            transport,
            settings,
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Token that stops every watcher when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Starts a watcher for `account` that runs the account's command for
    /// every new message.
    pub fn spawn(&mut self, account: AccountConfig) {
        let handler = CallbackDispatcher::new(&account);
        let span = info_span!("watcher", account = %account.name);
        let watcher = AccountWatcher::new(
            Arc::new(account),
            self.settings,
            self.transport.clone(),
            handler,
            self.cancel.child_token(),
        );
        self.tasks.spawn(watcher.run().instrument(span));
    }

    /// Number of watchers that have not finished yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if no watcher is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Asks every watcher to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Waits for all watchers to finish.
    ///
    /// When `shutdown` completes every watcher is asked to stop; this then
    /// returns once the last one has released its session.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Vec<WatcherReport> {
        info!(accounts = self.tasks.len(), "watching");
        let mut reports = Vec::with_capacity(self.tasks.len());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown, if !self.cancel.is_cancelled() => {
                    info!("stopping watchers");
                    self.cancel.cancel();
                }
                joined = self.tasks.join_next() => match joined {
                    Some(Ok(report)) => {
                        info!(
                            account = %report.account,
                            errors = report.total_errors,
                            messages = report.new_messages,
                            "watcher finished"
                        );
                        reports.push(report);
                    }
                    Some(Err(err)) => error!(error = %err, "watcher task failed"),
                    None => break,
                },
            }
        }

        reports
    }
}
