//! Commands submitted for delivery to connected devices.

use chrono::{DateTime, SecondsFormat, Utc};

use super::DeviceId;

/// Prefix of every pushed payload, followed by the dispatch timestamp.
pub const PUSH_PREFIX: &str = "time now: ";

/// An instruction to deliver a message to one device or to all of them.
///
/// Decoded from a single `POST /command` request and consumed by exactly
/// one dispatch. The raw request body is kept because it is part of the
/// pushed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    target: Option<DeviceId>,
    id: String,
    kind: i64,
    message: String,
    raw_body: String,
}

impl Command {
    /// Creates a command. An empty `device_id` means "no specific target".
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        id: impl Into<String>,
        kind: i64,
        message: impl Into<String>,
        raw_body: impl Into<String>,
    ) -> Self {
        let device_id = device_id.into();
        Self {
            target: (!device_id.is_empty()).then(|| DeviceId::new(device_id)),
            id: id.into(),
            kind,
            message: message.into(),
            raw_body: raw_body.into(),
        }
    }

    /// Returns the requested target, or `None` for a broadcast.
    #[must_use]
    pub fn target(&self) -> Option<&DeviceId> {
        self.target.as_ref()
    }

    /// Returns the caller-supplied correlation identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the opaque kind tag.
    #[must_use]
    pub const fn kind(&self) -> i64 {
        self.kind
    }

    /// Returns the free-text message body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the request body exactly as submitted.
    #[must_use]
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// Builds the text pushed to devices:
    /// `"time now: <RFC 3339 timestamp>\n<raw body>"`.
    #[must_use]
    pub fn push_payload(&self, at: DateTime<Utc>) -> String {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut payload =
            String::with_capacity(PUSH_PREFIX.len() + timestamp.len() + 1 + self.raw_body.len());
        payload.push_str(PUSH_PREFIX);
        payload.push_str(&timestamp);
        payload.push('\n');
        payload.push_str(&self.raw_body);
        payload
    }
}
