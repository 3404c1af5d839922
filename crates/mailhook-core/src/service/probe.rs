//! One-shot account check.

use mailhook_imap::{MailboxStatus, Session};
use tracing::{debug, info};

use crate::account::AccountConfig;
use crate::envelope::{EnvelopeSummary, summarize};

/// The newest message of a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestMessage {
    /// Sequence number.
    pub number: u32,
    /// Envelope summary.
    pub summary: EnvelopeSummary,
}

/// What a probe learned about an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Account name.
    pub account: String,
    /// Server capabilities, sorted.
    pub capabilities: Vec<String>,
    /// Folder counters at selection time.
    pub mailbox: Option<MailboxStatus>,
    /// Newest message, if the folder is not empty and the server returned
    /// an envelope for it.
    pub latest: Option<LatestMessage>,
}

impl ProbeReport {
    /// Whether the server can push updates with IDLE.
    #[must_use]
    pub fn supports_idle(&self) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case("IDLE"))
    }
}

/// Connects to an account, opens its folder read-only and reads the newest
/// envelope. The session is always logged out.
///
/// # Errors
///
/// Returns an error if connecting, logging in, selecting the folder or
/// fetching fails.
pub async fn probe(account: &AccountConfig) -> mailhook_imap::Result<ProbeReport> {
    info!(account = %account.name, host = %account.server.host, "probing account");
    let mut session = Session::open(&account.server, Some(account.folder.as_str()), true).await?;

    let result = inspect(&mut session).await;
    let mailbox = session.mailbox().cloned();
    session.release().await;
    let (capabilities, latest) = result?;

    debug!(account = %account.name, capabilities = capabilities.len(), "probe finished");
    Ok(ProbeReport {
        account: account.name.clone(),
        capabilities,
        mailbox,
        latest,
    })
}

async fn inspect(
    session: &mut Session,
) -> mailhook_imap::Result<(Vec<String>, Option<LatestMessage>)> {
    let capabilities = session.capabilities().await?;

    let Some(number) = session.mailbox().and_then(MailboxStatus::latest) else {
        return Ok((capabilities, None));
    };
    let latest = session
        .fetch_envelope(number)
        .await?
        .map(|raw| LatestMessage {
            number,
            summary: summarize(&raw),
        });

    Ok((capabilities, latest))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mailhook_imap::{ErrorKind, ServerConfig};

    use super::*;

    #[test]
    fn test_supports_idle() {
        let mut report = ProbeReport {
            account: "work".into(),
            capabilities: vec!["IMAP4rev1".into(), "idle".into()],
            mailbox: None,
            latest: None,
        };
        assert!(report.supports_idle());

        report.capabilities.pop();
        assert!(!report.supports_idle());
    }

    #[tokio::test]
    async fn test_probe_without_credentials() {
        let account = AccountConfig::new("work", ServerConfig::new("127.0.0.1"));
        let err = probe(&account).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }
}
