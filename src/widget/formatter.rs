//! Message formatting for the chat transcript
//!
//! Turns raw backend [`Message`] records into [`RenderMessage`]s: every
//! record gets an id, a parsed timestamp and a session, and the list is
//! sorted by time. Formatting never fails; missing fields are substituted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::model::Message;

/// Author of a rendered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Bot,
}

/// A message ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderMessage {
    /// Identifier, unique within one formatting pass
    pub id: String,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the Unix epoch, used for ordering
    pub sort_key: i64,
    pub session_id: Option<String>,
}

impl RenderMessage {
    /// Whether the assistant wrote this message
    pub fn is_bot(&self) -> bool {
        self.kind == MessageKind::Bot
    }
}

/// Identifier used for a message without a `messageId`
///
/// Derived from the message's position in the raw list so it stays the
/// same across formatting passes over the same list.
fn synthesized_id(index: usize) -> String {
    format!("local-{}", index)
}

/// Format raw messages for rendering
///
/// The result is sorted by timestamp ascending; messages with equal
/// timestamps keep their original relative order. Missing or unparseable
/// timestamps become the current time and messages without a session
/// inherit `fallback_session`.
///
/// # Arguments
///
/// * `messages` - Raw messages in store order
/// * `fallback_session` - Current store session id
///
/// # Returns
///
/// Returns the normalized, time-ordered messages
///
/// # Examples
///
/// ```
/// use docchat::model::Message;
/// use docchat::widget::formatter::{format_messages, MessageKind};
///
/// let raw = vec![
///     Message::assistant("later").with_id("2").at("2025-03-01T10:00:05Z".parse().unwrap()),
///     Message::user("first").with_id("1").at("2025-03-01T10:00:00Z".parse().unwrap()),
/// ];
/// let formatted = format_messages(&raw, Some("s1"));
/// assert_eq!(formatted[0].id, "1");
/// assert_eq!(formatted[1].kind, MessageKind::Bot);
/// assert_eq!(formatted[1].session_id.as_deref(), Some("s1"));
/// ```
pub fn format_messages(messages: &[Message], fallback_session: Option<&str>) -> Vec<RenderMessage> {
    let now = Utc::now();
    let mut seen = HashSet::with_capacity(messages.len());

    let mut formatted: Vec<RenderMessage> = messages
        .iter()
        .enumerate()
        .map(|(index, msg)| {
            let timestamp = msg.parsed_timestamp().unwrap_or(now);
            let mut id = msg
                .message_id
                .clone()
                .unwrap_or_else(|| synthesized_id(index));
            if !seen.insert(id.clone()) {
                id = format!("{}#{}", id, index);
                seen.insert(id.clone());
            }

            RenderMessage {
                id,
                kind: if msg.user_message {
                    MessageKind::User
                } else {
                    MessageKind::Bot
                },
                content: msg.content.clone(),
                timestamp,
                sort_key: timestamp.timestamp_millis(),
                session_id: msg
                    .session_id
                    .clone()
                    .or_else(|| fallback_session.map(str::to_string)),
            }
        })
        .collect();

    formatted.sort_by_key(|m| m.sort_key);
    formatted
}

/// The message the typing animation may render against
///
/// Only the last formatted message qualifies, and only when the assistant
/// wrote it in the active session.
pub fn typing_target<'a>(
    formatted: &'a [RenderMessage],
    active_session: Option<&str>,
) -> Option<&'a RenderMessage> {
    formatted
        .last()
        .filter(|last| last.is_bot() && last.session_id.as_deref() == active_session)
}
