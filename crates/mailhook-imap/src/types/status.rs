//! Server status updates received while idling.

use async_imap::imap_proto::{MailboxDatum, Response};

/// What an untagged status line reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    /// `* n EXISTS`: the folder now holds `n` messages.
    Exists,
    /// `* n RECENT`: `n` messages carry the `\Recent` flag.
    Recent,
    /// `* n EXPUNGE`: message `n` was removed.
    Expunge,
    /// `* n FETCH (...)`: message `n` changed (usually flags).
    Fetch,
    /// Anything else, labelled with the response keyword.
    Other(String),
}

impl StatusKind {
    /// Returns the IMAP keyword for this kind.
    #[must_use]
    pub fn keyword(&self) -> &str {
        match self {
            Self::Exists => "EXISTS",
            Self::Recent => "RECENT",
            Self::Expunge => "EXPUNGE",
            Self::Fetch => "FETCH",
            Self::Other(label) => label,
        }
    }
}

/// One `(value, kind)` pair from the server.
///
/// Responses without a numeric value carry `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    /// Count or sequence number.
    pub value: u32,
    /// What the value means.
    pub kind: StatusKind,
}

impl ServerStatus {
    /// Creates a status pair.
    #[must_use]
    pub const fn new(value: u32, kind: StatusKind) -> Self {
        Self { value, kind }
    }

    /// Creates an `EXISTS` pair.
    #[must_use]
    pub const fn exists(count: u32) -> Self {
        Self::new(count, StatusKind::Exists)
    }

    /// Creates a `RECENT` pair.
    #[must_use]
    pub const fn recent(count: u32) -> Self {
        Self::new(count, StatusKind::Recent)
    }

    /// Converts a parsed untagged response.
    #[must_use]
    pub fn from_response(response: &Response<'_>) -> Self {
        match response {
            Response::MailboxData(MailboxDatum::Exists(n)) => Self::exists(*n),
            Response::MailboxData(MailboxDatum::Recent(n)) => Self::recent(*n),
            Response::Expunge(n) => Self::new(*n, StatusKind::Expunge),
            Response::Fetch(n, _) => Self::new(*n, StatusKind::Fetch),
            Response::Data { status, .. } => {
                Self::new(0, StatusKind::Other(format!("{status:?}").to_uppercase()))
            }
            Response::MailboxData(_) => Self::new(0, StatusKind::Other("MAILBOX".into())),
            _ => Self::new(0, StatusKind::Other("OTHER".into())),
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.value, self.kind.keyword())
    }
}
