//! Envelope summaries.
//!
//! Turns the raw ENVELOPE bytes fetched from the server into decoded,
//! typed fields. Header values are decoded as UTF-8 (lossy) and trimmed;
//! empty values become `None`.

use chrono::{DateTime, FixedOffset};
use mailhook_imap::{RawAddress, RawEnvelope};

/// A decoded mail address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain part.
    pub host: Option<String>,
}

impl Address {
    /// Creates an address from its parts.
    #[must_use]
    pub fn new(name: Option<&str>, mailbox: Option<&str>, host: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            mailbox: mailbox.map(str::to_string),
            host: host.map(str::to_string),
        }
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `mailbox@host`, or `None` unless both parts are present.
    #[must_use]
    pub fn mail(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(mailbox), Some(host)) => Some(format!("{mailbox}@{host}")),
            _ => None,
        }
    }
}

impl std::fmt::Display for Address {
    /// Renders `Name <mailbox@host>`, or the bare address without a name.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let address = self.mail().unwrap_or_else(|| {
            self.mailbox
                .as_deref()
                .or(self.host.as_deref())
                .unwrap_or_default()
                .to_string()
        });
        match &self.name {
            Some(name) if needs_quoting(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{address}>")
            }
            Some(name) => write!(f, "{name} <{address}>"),
            None => f.write_str(&address),
        }
    }
}

/// Whether a display name contains RFC 5322 specials.
fn needs_quoting(name: &str) -> bool {
    name.contains(|c: char| {
        matches!(
            c,
            '(' | ')' | '<' | '>' | '[' | ']' | ':' | ';' | '@' | '\\' | ',' | '.' | '"'
        )
    })
}

impl From<&RawAddress> for Address {
    fn from(raw: &RawAddress) -> Self {
        Self {
            name: text(raw.name.as_deref()),
            mailbox: text(raw.mailbox.as_deref()),
            host: text(raw.host.as_deref()),
        }
    }
}

/// Decoded metadata of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeSummary {
    /// `Date` header.
    pub date: Option<DateTime<FixedOffset>>,
    /// `Subject` header.
    pub subject: Option<String>,
    /// `From` addresses.
    pub from: Vec<Address>,
    /// `Sender` addresses.
    pub sender: Vec<Address>,
    /// `Reply-To` addresses.
    pub reply_to: Vec<Address>,
    /// `To` addresses.
    pub to: Vec<Address>,
    /// `Cc` addresses.
    pub cc: Vec<Address>,
    /// `Bcc` addresses.
    pub bcc: Vec<Address>,
    /// `In-Reply-To` header.
    pub in_reply_to: Option<String>,
    /// `Message-ID` header.
    pub message_id: Option<String>,
}

impl EnvelopeSummary {
    /// First `From` address.
    #[must_use]
    pub fn from_first(&self) -> Option<&Address> {
        self.from.first()
    }

    /// First `Sender` address.
    #[must_use]
    pub fn sender_first(&self) -> Option<&Address> {
        self.sender.first()
    }

    /// First `Reply-To` address.
    #[must_use]
    pub fn reply_to_first(&self) -> Option<&Address> {
        self.reply_to.first()
    }

    /// First `To` address.
    #[must_use]
    pub fn to_first(&self) -> Option<&Address> {
        self.to.first()
    }

    /// First `Cc` address.
    #[must_use]
    pub fn cc_first(&self) -> Option<&Address> {
        self.cc.first()
    }

    /// First `Bcc` address.
    #[must_use]
    pub fn bcc_first(&self) -> Option<&Address> {
        self.bcc.first()
    }

    /// The author: first `From`, else first `Sender`.
    #[must_use]
    pub fn author(&self) -> Option<&Address> {
        self.from_first().or_else(|| self.sender_first())
    }
}

/// Decodes a raw envelope.
#[must_use]
pub fn summarize(raw: &RawEnvelope) -> EnvelopeSummary {
    EnvelopeSummary {
        date: text(raw.date.as_deref()).and_then(|date| parse_date(&date)),
        subject: text(raw.subject.as_deref()),
        from: addresses(&raw.from),
        sender: addresses(&raw.sender),
        reply_to: addresses(&raw.reply_to),
        to: addresses(&raw.to),
        cc: addresses(&raw.cc),
        bcc: addresses(&raw.bcc),
        in_reply_to: text(raw.in_reply_to.as_deref()),
        message_id: text(raw.message_id.as_deref()),
    }
}

fn addresses(raw: &[RawAddress]) -> Vec<Address> {
    raw.iter().map(Address::from).collect()
}

fn text(raw: Option<&[u8]>) -> Option<String> {
    let decoded = String::from_utf8_lossy(raw?);
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses an RFC 2822 date, tolerating a trailing `(zone)` comment.
fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value).ok().or_else(|| {
        let (head, tail) = value.rsplit_once('(')?;
        if !tail.ends_with(')') {
            return None;
        }
        DateTime::parse_from_rfc2822(head.trim_end()).ok()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw_address(name: Option<&str>, mailbox: &str, host: &str) -> RawAddress {
        RawAddress::new(name, Some(mailbox), Some(host))
    }

    #[test]
    fn test_absent_subject_present_from() {
        let raw = RawEnvelope {
            from: vec![raw_address(Some("Fred Foobar"), "foobar", "example.com")],
            ..RawEnvelope::default()
        };
        let summary = summarize(&raw);

        let fred = Address::new(Some("Fred Foobar"), Some("foobar"), Some("example.com"));
        assert_eq!(summary.subject, None);
        assert_eq!(summary.from, vec![fred.clone()]);
        assert_eq!(summary.author(), Some(&fred));
    }

    #[test]
    fn test_author_falls_back_to_sender() {
        let raw = RawEnvelope {
            sender: vec![raw_address(None, "list", "example.org")],
            ..RawEnvelope::default()
        };
        let summary = summarize(&raw);
        assert_eq!(summary.author().unwrap().mail().unwrap(), "list@example.org");
    }

    #[test]
    fn test_text_fields_are_trimmed_and_empty_is_none() {
        let raw = RawEnvelope {
            subject: Some(b"  Quarterly report \r\n".to_vec()),
            message_id: Some(b"   ".to_vec()),
            in_reply_to: Some(b"<a@b>".to_vec()),
            ..RawEnvelope::default()
        };
        let summary = summarize(&raw);
        assert_eq!(summary.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(summary.message_id, None);
        assert_eq!(summary.in_reply_to.as_deref(), Some("<a@b>"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let raw = RawEnvelope {
            subject: Some(b"caf\xe9".to_vec()),
            ..RawEnvelope::default()
        };
        assert_eq!(summarize(&raw).subject.as_deref(), Some("caf\u{fffd}"));
    }

    #[test]
    fn test_address_lists_keep_their_own_fields() {
        let raw = RawEnvelope {
            to: vec![raw_address(None, "to", "example.com")],
            cc: vec![raw_address(None, "cc", "example.com")],
            bcc: vec![raw_address(None, "bcc", "example.com")],
            reply_to: vec![raw_address(None, "reply", "example.com")],
            ..RawEnvelope::default()
        };
        let summary = summarize(&raw);
        assert_eq!(summary.to_first().unwrap().mailbox.as_deref(), Some("to"));
        assert_eq!(summary.cc_first().unwrap().mailbox.as_deref(), Some("cc"));
        assert_eq!(summary.bcc_first().unwrap().mailbox.as_deref(), Some("bcc"));
        assert_eq!(
            summary.reply_to_first().unwrap().mailbox.as_deref(),
            Some("reply")
        );
        assert!(summary.from_first().is_none());
        assert!(summary.author().is_none());
    }

    #[test]
    fn test_date_parsing() {
        let parse = |value: &[u8]| {
            summarize(&RawEnvelope {
                date: Some(value.to_vec()),
                ..RawEnvelope::default()
            })
            .date
        };

        let date = parse(b"Mon, 7 Feb 1994 21:52:25 -0800").unwrap();
        assert_eq!(date.to_rfc3339(), "1994-02-07T21:52:25-08:00");

        let commented = parse(b"Tue, 3 Oct 2023 09:15:00 +0200 (CEST)").unwrap();
        assert_eq!(commented.to_rfc3339(), "2023-10-03T09:15:00+02:00");

        assert!(parse(b"yesterday").is_none());
        assert!(parse(b"").is_none());
    }

    #[test]
    fn test_address_rendering() {
        let full = Address::new(Some("Fred"), Some("fred"), Some("example.com"));
        assert_eq!(full.to_string(), "Fred <fred@example.com>");
        assert_eq!(full.name(), Some("Fred"));

        let bare = Address::new(None, Some("fred"), Some("example.com"));
        assert_eq!(bare.to_string(), "fred@example.com");

        let group = Address::new(None, Some("undisclosed-recipients"), None);
        assert_eq!(group.to_string(), "undisclosed-recipients");
        assert_eq!(group.mail(), None);
    }

    #[test]
    fn test_display_name_with_specials_is_quoted() {
        let comma = Address::new(Some("Doe, John"), Some("j"), Some("x.org"));
        assert_eq!(comma.to_string(), "\"Doe, John\" <j@x.org>");

        let initial = Address::new(Some("John Q. Public"), Some("jqp"), Some("x.org"));
        assert_eq!(initial.to_string(), "\"John Q. Public\" <jqp@x.org>");

        let quote = Address::new(Some(r#"The "Boss""#), Some("b"), Some("x.org"));
        assert_eq!(quote.to_string(), r#""The \"Boss\"" <b@x.org>"#);

        let plain = Address::new(Some("John Doe"), Some("j"), Some("x.org"));
        assert_eq!(plain.to_string(), "John Doe <j@x.org>");
    }

    #[test]
    fn test_empty_address_parts_are_none() {
        let raw = RawAddress::new(Some(""), Some("fred"), Some(" example.com "));
        let address = Address::from(&raw);
        assert_eq!(address.name, None);
        assert_eq!(address.host.as_deref(), Some("example.com"));
    }
}
