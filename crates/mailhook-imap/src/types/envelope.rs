//! Owned copies of the ENVELOPE fetch item.
//!
//! The parser hands out envelopes borrowing the response buffer; these types
//! detach the raw bytes so they outlive the session that fetched them.
//! Nothing is decoded here.

use std::borrow::Cow;

use async_imap::imap_proto;

/// Raw address structure (RFC 3501 section 7.4.2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAddress {
    /// Display name.
    pub name: Option<Vec<u8>>,
    /// Source route (obsolete).
    pub adl: Option<Vec<u8>>,
    /// Local part.
    pub mailbox: Option<Vec<u8>>,
    /// Domain part.
    pub host: Option<Vec<u8>>,
}

impl RawAddress {
    /// Creates an address from string parts.
    #[must_use]
    pub fn new(name: Option<&str>, mailbox: Option<&str>, host: Option<&str>) -> Self {
        Self {
            name: name.map(|s| s.as_bytes().to_vec()),
            adl: None,
            mailbox: mailbox.map(|s| s.as_bytes().to_vec()),
            host: host.map(|s| s.as_bytes().to_vec()),
        }
    }
}

impl From<&imap_proto::Address<'_>> for RawAddress {
    fn from(address: &imap_proto::Address<'_>) -> Self {
        Self {
            name: owned(address.name.as_ref()),
            adl: owned(address.adl.as_ref()),
            mailbox: owned(address.mailbox.as_ref()),
            host: owned(address.host.as_ref()),
        }
    }
}

/// Raw envelope structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEnvelope {
    /// `Date` header.
    pub date: Option<Vec<u8>>,
    /// `Subject` header.
    pub subject: Option<Vec<u8>>,
    /// `From` addresses.
    pub from: Vec<RawAddress>,
    /// `Sender` addresses.
    pub sender: Vec<RawAddress>,
    /// `Reply-To` addresses.
    pub reply_to: Vec<RawAddress>,
    /// `To` addresses.
    pub to: Vec<RawAddress>,
    /// `Cc` addresses.
    pub cc: Vec<RawAddress>,
    /// `Bcc` addresses.
    pub bcc: Vec<RawAddress>,
    /// `In-Reply-To` header.
    pub in_reply_to: Option<Vec<u8>>,
    /// `Message-ID` header.
    pub message_id: Option<Vec<u8>>,
}

impl From<&imap_proto::Envelope<'_>> for RawEnvelope {
    fn from(envelope: &imap_proto::Envelope<'_>) -> Self {
        Self {
            date: owned(envelope.date.as_ref()),
            subject: owned(envelope.subject.as_ref()),
            from: addresses(envelope.from.as_ref()),
            sender: addresses(envelope.sender.as_ref()),
            reply_to: addresses(envelope.reply_to.as_ref()),
            to: addresses(envelope.to.as_ref()),
            cc: addresses(envelope.cc.as_ref()),
            bcc: addresses(envelope.bcc.as_ref()),
            in_reply_to: owned(envelope.in_reply_to.as_ref()),
            message_id: owned(envelope.message_id.as_ref()),
        }
    }
}

fn owned(value: Option<&Cow<'_, [u8]>>) -> Option<Vec<u8>> {
    value.map(|bytes| bytes.to_vec())
}

fn addresses(list: Option<&Vec<imap_proto::Address<'_>>>) -> Vec<RawAddress> {
    list.map(|list| list.iter().map(RawAddress::from).collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_imap::imap_proto::parser::parse_response;
    use async_imap::imap_proto::{AttributeValue, Response};

    use super::*;

    #[test]
    fn test_from_parsed_envelope() {
        let line = b"* 3 FETCH (ENVELOPE (\"Mon, 7 Feb 1994 21:52:25 -0800\" \"Hello\" \
            ((\"Fred Foobar\" NIL \"foobar\" \"example.com\")) NIL NIL \
            ((NIL NIL \"alice\" \"example.org\")) NIL NIL NIL \"<b27397@example.com>\"))\r\n";
        let (_, response) = parse_response(line).unwrap();

        let Response::Fetch(seq, attributes) = response else {
            panic!("expected FETCH response");
        };
        assert_eq!(seq, 3);

        let envelope = attributes
            .iter()
            .find_map(|attr| match attr {
                AttributeValue::Envelope(envelope) => Some(RawEnvelope::from(envelope.as_ref())),
                _ => None,
            })
            .unwrap();

        assert_eq!(envelope.subject.as_deref(), Some(&b"Hello"[..]));
        assert_eq!(envelope.from.len(), 1);
        assert_eq!(envelope.from[0].mailbox.as_deref(), Some(&b"foobar"[..]));
        assert_eq!(envelope.from[0].name.as_deref(), Some(&b"Fred Foobar"[..]));
        assert!(envelope.sender.is_empty());
        assert_eq!(envelope.to[0].host.as_deref(), Some(&b"example.org"[..]));
        assert!(envelope.to[0].name.is_none());
        assert!(envelope.in_reply_to.is_none());
        assert_eq!(
            envelope.message_id.as_deref(),
            Some(&b"<b27397@example.com>"[..])
        );
    }
}
