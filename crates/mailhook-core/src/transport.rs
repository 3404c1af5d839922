//! The seam between watchers and the IMAP transport.
//!
//! Watchers only need to open a read-only session on their folder, idle on
//! it and fetch one envelope at a time. Keeping that behind a trait lets the
//! state machine run against an in-memory transport in tests.

use std::future::Future;
use std::time::Duration;

use mailhook_imap::{ImapStream, RawEnvelope, ServerStatus, Session};

use crate::account::AccountConfig;

/// An open, read-only session on an account's folder.
pub trait NotifySession: Send {
    /// Enters notification mode (IMAP IDLE).
    fn enter_notify(&mut self) -> impl Future<Output = mailhook_imap::Result<()>> + Send;

    /// Waits up to `timeout` for server updates.
    fn wait_for_updates(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = mailhook_imap::Result<Vec<ServerStatus>>> + Send;

    /// Fetches the envelope of one message.
    fn fetch_envelope(
        &mut self,
        number: u32,
    ) -> impl Future<Output = mailhook_imap::Result<Option<RawEnvelope>>> + Send;

    /// Leaves notification mode if needed and logs out. Never fails.
    fn release(self) -> impl Future<Output = ()> + Send;
}

/// Opens sessions for an account.
pub trait Transport: Send + Sync + 'static {
    /// Session type handed out by [`Transport::open`].
    type Session: NotifySession;

    /// Connects, authenticates and opens the account's folder read-only.
    fn open(
        &self,
        account: &AccountConfig,
    ) -> impl Future<Output = mailhook_imap::Result<Self::Session>> + Send;
}

/// Transport backed by real IMAP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapTransport;

impl Transport for ImapTransport {
    type Session = Session<ImapStream>;

    fn open(
        &self,
        account: &AccountConfig,
    ) -> impl Future<Output = mailhook_imap::Result<Self::Session>> + Send {
        Session::open(&account.server, Some(account.folder.as_str()), true)
    }
}

impl NotifySession for Session<ImapStream> {
    fn enter_notify(&mut self) -> impl Future<Output = mailhook_imap::Result<()>> + Send {
        self.idle()
    }

    fn wait_for_updates(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = mailhook_imap::Result<Vec<ServerStatus>>> + Send {
        self.wait(timeout)
    }

    fn fetch_envelope(
        &mut self,
        number: u32,
    ) -> impl Future<Output = mailhook_imap::Result<Option<RawEnvelope>>> + Send {
        Session::fetch_envelope(self, number)
    }

    fn release(self) -> impl Future<Output = ()> + Send {
        Session::release(self)
    }
}
