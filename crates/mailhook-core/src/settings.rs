//! Watcher tuning shared by all accounts.

use std::time::Duration;

use mailhook_imap::connection::MAX_POLL_TIMEOUT;

/// Timing and failure policy for account watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    /// Consecutive errors after which a watcher gives up. `0` never gives up.
    pub max_errors: u32,
    /// Pause after a failed connection or IDLE cycle.
    pub error_backoff: Duration,
    /// Age after which an idling connection is replaced. Zero disables.
    pub reconnect_after: Duration,
    /// Upper bound of a single wait for server updates.
    pub poll_timeout: Duration,
}

impl WatcherSettings {
    /// Default pause after an error.
    pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(60);
    /// Default forced reconnection interval.
    pub const DEFAULT_RECONNECT_AFTER: Duration = Duration::from_secs(600);
    /// Default poll bound.
    pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(15);

    /// Sets the error limit.
    #[must_use]
    pub const fn with_max_errors(mut self, max_errors: u32) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Sets the error backoff.
    #[must_use]
    pub const fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Sets the forced reconnection interval.
    #[must_use]
    pub const fn with_reconnect_after(mut self, interval: Duration) -> Self {
        self.reconnect_after = interval;
        self
    }

    /// Sets the poll bound.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Returns true once a connection of the given age must be replaced.
    #[must_use]
    pub fn reconnect_due(&self, age: Duration) -> bool {
        !self.reconnect_after.is_zero() && age > self.reconnect_after
    }

    /// Returns true once `errors` consecutive failures exhaust the limit.
    #[must_use]
    pub const fn error_limit_reached(&self, errors: u32) -> bool {
        self.max_errors > 0 && errors >= self.max_errors
    }

    /// Returns true if the poll bound is usable for IDLE.
    #[must_use]
    pub fn poll_timeout_valid(&self) -> bool {
        !self.poll_timeout.is_zero() && self.poll_timeout < MAX_POLL_TIMEOUT
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            max_errors: 0,
            error_backoff: Self::DEFAULT_ERROR_BACKOFF,
            reconnect_after: Self::DEFAULT_RECONNECT_AFTER,
            poll_timeout: Self::DEFAULT_POLL_TIMEOUT,
        }
    }
}
