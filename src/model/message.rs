use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::deserialize_opt_id;

/// A single chat message as stored by the backend
///
/// Every field except `userMessage` and `content` may be absent in practice;
/// consumers must tolerate that rather than fail.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Backend identifier
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub message_id: Option<String>,
    /// Session this message belongs to
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub session_id: Option<String>,
    /// True for messages written by the user
    #[serde(default, alias = "isUserMessage")]
    pub user_message: bool,
    /// Message text
    #[serde(default)]
    pub content: String,
    /// ISO-8601 timestamp, with or without an offset
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Message {
    /// Create a user message with no id or timestamp
    ///
    /// # Examples
    ///
    /// ```
    /// use docchat::model::Message;
    ///
    /// let msg = Message::user("hi");
    /// assert!(msg.user_message);
    /// assert!(msg.message_id.is_none());
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            user_message: true,
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create an assistant message with no id or timestamp
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            user_message: false,
            content: content.into(),
            ..Default::default()
        }
    }

    /// Set the message id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Set the owning session
    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the timestamp from a UTC instant
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp.to_rfc3339());
        self
    }

    /// Parsed timestamp, if present and well formed
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Zone-less layouts the backend writes, longest first
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a backend timestamp
///
/// Accepts RFC 3339 and zone-less `YYYY-MM-DDTHH:MM[:SS[.fff]]` values; the
/// latter are local wall-clock times and are read in the local zone.
///
/// # Examples
///
/// ```
/// use docchat::model::parse_timestamp;
///
/// assert!(parse_timestamp("2025-03-01T10:00:00Z").is_some());
/// assert!(parse_timestamp("2025-03-01T10:00:00.123").is_some());
/// assert!(parse_timestamp("2025-03-01T10:00").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(raw, &Local)
}

/// Parse a backend timestamp, reading zone-less values in `zone`
pub fn parse_timestamp_in<Tz: TimeZone>(raw: &str, zone: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?;
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Payload of a send-message request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Document the question is scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Existing session, or none to start one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}
