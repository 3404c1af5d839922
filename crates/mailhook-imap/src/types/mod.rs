//! Data handed out by a session.

mod envelope;
mod status;

pub use envelope::{RawAddress, RawEnvelope};
pub use status::{ServerStatus, StatusKind};

/// Counters reported when a folder is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Folder name as requested.
    pub name: String,
    /// Number of messages in the folder.
    pub exists: u32,
    /// Number of messages with the `\Recent` flag.
    pub recent: u32,
    /// Whether the folder was opened with EXAMINE.
    pub read_only: bool,
}

impl MailboxStatus {
    /// Sequence number of the newest message, if the folder is not empty.
    #[must_use]
    pub const fn latest(&self) -> Option<u32> {
        if self.exists == 0 { None } else { Some(self.exists) }
    }
}
