//! Shared types for the email intake path.

use mail_parser::{HeaderName, MessageParser};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// ── Inbound message ─────────────────────────────────────────────────

/// Envelope and header metadata of one inbound delivery.
///
/// Built by the mail transport (or the intake HTTP surface) per delivery.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEmailMessage {
    /// Envelope sender.
    pub from: String,
    /// Envelope recipient.
    pub to: String,
    /// `Subject` header, empty when absent.
    pub subject: String,
    /// `Message-ID` header.
    pub message_id: Option<String>,
    /// Size of the raw message in bytes.
    pub raw_size: u64,
    /// `Auto-Submitted` header (RFC 3834).
    pub auto_submitted: Option<String>,
}

impl InboundEmailMessage {
    /// Build metadata from a raw RFC 5322 message. Only the header block is read.
    pub fn from_raw(from: &str, to: &str, raw: &[u8]) -> Result<Self, ParseError> {
        let parsed = MessageParser::default()
            .parse_headers(raw)
            .ok_or(ParseError::NoHeaders)?;

        let auto_submitted = parsed
            .headers()
            .iter()
            .find(|h| h.name().eq_ignore_ascii_case("auto-submitted"))
            .map(|h| h.value().as_text().unwrap_or_default().trim().to_string());
        // Raw text keeps the angle brackets, matching what relays send as metadata.
        let message_id = parsed
            .header_raw(HeaderName::MessageId)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: parsed.subject().unwrap_or_default().to_string(),
            message_id,
            raw_size: raw.len() as u64,
            auto_submitted,
        })
    }

    /// The subset forwarded to the action processor.
    pub fn forward_payload(&self) -> EmailForwardPayload {
        EmailForwardPayload {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            message_id: self.message_id.clone(),
        }
    }
}

/// Body of the dispatch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailForwardPayload {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub message_id: Option<String>,
}

// ── Decisions ───────────────────────────────────────────────────────

/// Filter decision for an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Pass the message on to the action processor.
    Accept,
    /// Discard without any signal to the sender. `reason` is for logs only.
    SilentDrop { reason: String },
    /// Refuse at the protocol level.
    Reject { reason: String },
}

/// A protocol-level refusal communicated back to the sending mail system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
    /// Whether the sender may retry later.
    pub temporary: bool,
}

impl Rejection {
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            temporary: false,
        }
    }

    pub fn temporary(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            temporary: true,
        }
    }

    /// SMTP reply code a relay should use for this rejection.
    pub fn smtp_code(&self) -> u16 {
        if self.temporary { 451 } else { 552 }
    }
}

/// Terminal outcome of routing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Delivered to the action processor.
    Accept,
    /// Absorbed with no reply.
    SilentDrop,
    /// Refused with a reason.
    Reject(Rejection),
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: maaser@example.org\r\n\
Subject: RE: invoice\r\n\
Message-ID: <abc123@mail.example.com>\r\n\
Auto-Submitted: auto-replied\r\n\
\r\n\
Body is not inspected.\r\n";

    #[test]
    fn from_raw_extracts_headers() {
        let msg =
            InboundEmailMessage::from_raw("alice@example.com", "maaser@example.org", RAW).unwrap();
        assert_eq!(msg.subject, "RE: invoice");
        assert_eq!(msg.message_id.as_deref(), Some("<abc123@mail.example.com>"));
        assert_eq!(msg.auto_submitted.as_deref(), Some("auto-replied"));
        assert_eq!(msg.raw_size, RAW.len() as u64);
        assert_eq!(msg.from, "alice@example.com");
    }

    #[test]
    fn from_raw_without_optional_headers() {
        let raw = b"From: bob@example.com\r\nTo: x@example.org\r\n\r\nhi\r\n";
        let msg = InboundEmailMessage::from_raw("bob@example.com", "x@example.org", raw).unwrap();
        assert_eq!(msg.subject, "");
        assert!(msg.message_id.is_none());
        assert!(msg.auto_submitted.is_none());
    }

    #[test]
    fn raw_and_metadata_paths_forward_the_same_message_id() {
        let raw = b"From: a@example.com\r\nMessage-ID:   <m1@example.com>  \r\n\r\nbody\r\n";
        let msg = InboundEmailMessage::from_raw("a@example.com", "b@example.org", raw).unwrap();
        assert_eq!(
            msg.forward_payload().message_id.as_deref(),
            Some("<m1@example.com>")
        );
    }

    #[test]
    fn forward_payload_uses_camel_case() {
        let msg = InboundEmailMessage {
            from: "a@example.com".into(),
            to: "b@example.org".into(),
            subject: "Hello".into(),
            message_id: None,
            raw_size: 10,
            auto_submitted: None,
        };
        let json = serde_json::to_value(msg.forward_payload()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "from": "a@example.com",
                "to": "b@example.org",
                "subject": "Hello",
                "messageId": null,
            })
        );
    }

    #[test]
    fn smtp_codes_follow_rejection_kind() {
        assert_eq!(Rejection::permanent("message too large").smtp_code(), 552);
        assert_eq!(Rejection::temporary("Temporary System Error").smtp_code(), 451);
    }
}
