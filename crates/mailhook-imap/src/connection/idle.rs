//! IMAP IDLE command support (RFC 2177).
//!
//! IDLE keeps the connection open and lets the server push untagged status
//! lines. A poll waits for the first line, then keeps reading for a short
//! settle window so that lines the server emits together (`EXISTS` followed
//! by `RECENT`) end up in the same batch.

use std::fmt::Debug;
use std::io;
use std::time::Duration;

use async_imap::extensions::idle::{Handle, IdleResponse};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::types::ServerStatus;
use crate::{Error, Result};

/// Longest single wait the protocol allows.
///
/// RFC 2177 has servers drop idle clients after 30 minutes of silence.
pub const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(29 * 60);

/// How long to keep reading after the first update of a batch.
pub const SETTLE_WINDOW: Duration = Duration::from_millis(250);

/// Upper bound on the number of updates gathered in one poll.
const MAX_BATCH: usize = 64;

/// Waits up to `timeout` for status updates and returns them in arrival order.
///
/// An empty vector means the wait timed out quietly. Keep-alive lines such as
/// `* OK Still here` are filtered by the client library.
///
/// # Errors
///
/// Returns [`Error::Notify`] if reading fails or the server closes the
/// connection, even when updates were already collected.
pub(crate) async fn collect_updates<S>(
    handle: &mut Handle<S>,
    timeout: Duration,
) -> Result<Vec<ServerStatus>>
where
    S: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    let mut updates = Vec::new();
    let mut window = timeout.min(MAX_POLL_TIMEOUT);

    while updates.len() < MAX_BATCH {
        let (wait, _stop) = handle.wait_with_timeout(window);
        match wait.await.map_err(Error::Notify)? {
            IdleResponse::NewData(data) => {
                let status = ServerStatus::from_response(data.parsed());
                tracing::trace!(%status, "idle update");
                updates.push(status);
                window = SETTLE_WINDOW;
            }
            IdleResponse::Timeout => break,
            // The stop source is never triggered, so this only happens once
            // the server closed the stream.
            IdleResponse::ManualInterrupt => {
                return Err(Error::Notify(async_imap::error::Error::Io(
                    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed while idling"),
                )));
            }
        }
    }

    Ok(updates)
}
