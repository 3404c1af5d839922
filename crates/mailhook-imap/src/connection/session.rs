//! Authenticated IMAP session.
//!
//! `Session` wraps an `async-imap` session and tracks whether it is idling,
//! so callers get a mutable-reference API instead of juggling the
//! session/handle ownership transfer that IDLE requires.
//!
//! ## Example
//!
//! ```ignore
//! use mailhook_imap::{ServerConfig, Security, Session};
//!
//! let config = ServerConfig::builder("imap.example.com")
//!     .port(993)
//!     .security(Security::Implicit)
//!     .credentials("user@example.com", "password")
//!     .build();
//!
//! let mut session = Session::open(&config, Some("INBOX"), true).await?;
//! session.idle().await?;
//! let updates = session.wait(Duration::from_secs(15)).await?;
//! session.done().await?;
//! session.logout().await?;
//! ```

use std::fmt::Debug;
use std::time::Duration;

use async_imap::extensions::idle::Handle;
use async_imap::types::Capability;
use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncWrite};

use super::config::ServerConfig;
use super::idle::collect_updates;
use super::stream::{self, ImapStream};
use crate::types::{MailboxStatus, RawEnvelope, ServerStatus};
use crate::{Error, Result};

/// Current state of the session.
enum SessionState<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    /// Commands can be issued.
    Ready(async_imap::Session<S>),
    /// IDLE is active.
    Idle(Handle<S>),
    /// A failed transition consumed the connection.
    Closed,
}

/// Authenticated IMAP session.
pub struct Session<S = ImapStream>
where
    S: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    state: SessionState<S>,
    mailbox: Option<MailboxStatus>,
}

impl Session<ImapStream> {
    /// Connects, logs in and optionally selects a folder.
    ///
    /// With `read_only` the folder is opened with EXAMINE, so nothing done
    /// through this session can change message flags.
    ///
    /// # Errors
    ///
    /// Returns an error classified as connection, TLS, auth or folder failure.
    /// A session that was already authenticated is logged out before a
    /// folder error is returned.
    pub async fn open(config: &ServerConfig, folder: Option<&str>, read_only: bool) -> Result<Self> {
        let Some(credentials) = &config.credentials else {
            return Err(Error::MissingCredentials);
        };

        let stream = stream::connect(config).await?;
        let client = async_imap::Client::new(stream);
        let session = client
            .login(&credentials.username, &credentials.password)
            .await
            .map_err(|(err, _client)| Error::Auth(err))?;
        tracing::debug!(host = %config.host, user = %credentials.username, "logged in");

        let mut session = Self::from_session(session);
        if let Some(folder) = folder
            && let Err(err) = session.select(folder, read_only).await
        {
            session.release().await;
            return Err(err);
        }

        Ok(session)
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    /// Wraps an already authenticated session.
    pub const fn from_session(session: async_imap::Session<S>) -> Self {
        Self {
            state: SessionState::Ready(session),
            mailbox: None,
        }
    }

    /// Returns the selected folder, if any.
    #[must_use]
    pub const fn mailbox(&self) -> Option<&MailboxStatus> {
        self.mailbox.as_ref()
    }

    /// Returns true while IDLE is active.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle(_))
    }

    /// Selects a folder (EXAMINE when `read_only`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Folder`] if the server rejects the folder.
    pub async fn select(&mut self, folder: &str, read_only: bool) -> Result<&MailboxStatus> {
        let SessionState::Ready(session) = &mut self.state else {
            return Err(Error::InvalidState("select needs a session outside IDLE"));
        };

        let result = if read_only {
            session.examine(folder).await
        } else {
            session.select(folder).await
        };
        let mailbox = result.map_err(|source| Error::Folder {
            folder: folder.to_string(),
            source,
        })?;

        tracing::debug!(folder, exists = mailbox.exists, recent = mailbox.recent, "folder selected");
        Ok(self.mailbox.insert(MailboxStatus {
            name: folder.to_string(),
            exists: mailbox.exists,
            recent: mailbox.recent,
            read_only,
        }))
    }

    /// Lists the server capabilities, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn capabilities(&mut self) -> Result<Vec<String>> {
        let SessionState::Ready(session) = &mut self.state else {
            return Err(Error::InvalidState("CAPABILITY needs a session outside IDLE"));
        };

        let capabilities = session.capabilities().await.map_err(Error::Protocol)?;
        let mut names: Vec<String> = capabilities
            .iter()
            .map(|capability| match capability {
                Capability::Imap4rev1 => "IMAP4rev1".to_string(),
                Capability::Auth(mechanism) => format!("AUTH={mechanism}"),
                Capability::Atom(atom) => atom.clone(),
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Enters IDLE mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Notify`] if the server refuses IDLE. The connection
    /// is dropped in that case.
    pub async fn idle(&mut self) -> Result<()> {
        let session = match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Ready(session) => session,
            other => {
                self.state = other;
                return Err(Error::InvalidState("IDLE is already active or session closed"));
            }
        };

        let mut handle = session.idle();
        handle.init().await.map_err(Error::Notify)?;
        self.state = SessionState::Idle(handle);
        Ok(())
    }

    /// Waits up to `timeout` for status updates while idling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Notify`] if the connection fails while waiting.
    pub async fn wait(&mut self, timeout: Duration) -> Result<Vec<ServerStatus>> {
        let SessionState::Idle(handle) = &mut self.state else {
            return Err(Error::InvalidState("wait needs an active IDLE"));
        };
        collect_updates(handle, timeout).await
    }

    /// Leaves IDLE mode. Does nothing when not idling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Notify`] if DONE is not acknowledged. The connection
    /// is dropped in that case.
    pub async fn done(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Idle(handle) => {
                let session = handle.done().await.map_err(Error::Notify)?;
                self.state = SessionState::Ready(session);
                Ok(())
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    /// Fetches the envelope of one message by sequence number.
    ///
    /// Returns `None` when the server has no envelope for that number, for
    /// example because the message was expunged in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the command fails.
    pub async fn fetch_envelope(&mut self, number: u32) -> Result<Option<RawEnvelope>> {
        let SessionState::Ready(session) = &mut self.state else {
            return Err(Error::InvalidState("FETCH needs a session outside IDLE"));
        };

        let fetches: Vec<_> = session
            .fetch(number.to_string(), "ENVELOPE")
            .await
            .map_err(Error::Fetch)?
            .try_collect()
            .await
            .map_err(Error::Fetch)?;

        Ok(fetches
            .iter()
            .filter(|fetch| fetch.message == number)
            .find_map(|fetch| fetch.envelope().map(RawEnvelope::from)))
    }

    /// Leaves IDLE if needed and logs out.
    ///
    /// # Errors
    ///
    /// Returns an error if DONE or LOGOUT fails.
    pub async fn logout(mut self) -> Result<()> {
        self.done().await?;
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Ready(mut session) => session.logout().await.map_err(Error::Protocol),
            SessionState::Idle(_) | SessionState::Closed => Ok(()),
        }
    }

    /// Best-effort logout; failures are only logged.
    pub async fn release(self) {
        if let Err(err) = self.logout().await {
            tracing::debug!(error = %err, "logout failed, dropping connection");
        }
    }
}

impl<S> Debug for Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            SessionState::Ready(_) => "ready",
            SessionState::Idle(_) => "idle",
            SessionState::Closed => "closed",
        };
        f.debug_struct("Session")
            .field("state", &state)
            .field("mailbox", &self.mailbox)
            .finish()
    }
}
