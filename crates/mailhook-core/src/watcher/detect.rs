//! New-message detection in IDLE updates.

use mailhook_imap::{ServerStatus, StatusKind};

/// Finds the sequence number of a newly arrived message.
///
/// Servers announce a delivery as an `EXISTS` line next to a `RECENT` line,
/// in either order. The first such pair wins and its `EXISTS` count is the
/// number of the new message. Anything else yields `None`.
#[must_use]
pub fn detect_new_message(updates: &[ServerStatus]) -> Option<u32> {
    updates.windows(2).find_map(|pair| match pair {
        [exists, recent] | [recent, exists]
            if exists.kind == StatusKind::Exists && recent.kind == StatusKind::Recent =>
        {
            Some(exists.value)
        }
        _ => None,
    })
}
