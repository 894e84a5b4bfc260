//! Device identifier learned from message content.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Frame;

/// Routing key for a channel endpoint.
///
/// An arbitrary string, trusted on first use. The empty string is a legal
/// identifier. Endpoints never declare an identifier explicitly: every
/// inbound message doubles as a (re)bind, see [`DeviceId::from_frame`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a `DeviceId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the identifier carried by an inbound frame.
    ///
    /// Text frames are taken verbatim. Binary frames are read as UTF-8,
    /// replacing invalid sequences.
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Self {
        match frame {
            Frame::Text(text) => Self(text.clone()),
            Frame::Binary(bytes) => Self(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_is_taken_verbatim() {
        let frame = Frame::Text("  dev-A\n".to_string());
        assert_eq!(DeviceId::from_frame(&frame), DeviceId::new("  dev-A\n"));
    }

    #[test]
    fn binary_frame_is_read_lossily() {
        let frame = Frame::Binary(vec![b'd', b'e', b'v', 0xFF]);
        let id = DeviceId::from_frame(&frame);
        assert!(id.as_str().starts_with("dev"));
        assert!(id.as_str().ends_with('\u{FFFD}'));
    }

    #[test]
    fn empty_identifier_is_legal() {
        let id = DeviceId::new("");
        assert!(id.is_empty());
        assert_eq!(id.to_string(), "");
    }
}
