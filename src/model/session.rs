use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_null_default, deserialize_opt_id, Message};

/// Number of characters shown in a session preview
const PREVIEW_CHARS: usize = 30;

/// One logical chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Backend identifier
    #[serde(deserialize_with = "deserialize_id")]
    pub session_id: String,
    /// Display name, e.g. `Chat with: report.pdf (12)`
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub session_name: String,
    /// Document the session is scoped to
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub document_id: Option<String>,
    /// Messages embedded in the session listing
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub messages: Vec<Message>,
}

fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Chat with: ([^(]+)").expect("static pattern"))
}

impl Session {
    /// Create a session with no messages
    pub fn new(session_id: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            session_name: session_name.into(),
            document_id: None,
            messages: Vec::new(),
        }
    }

    /// Attach a document id
    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// File name embedded in a `Chat with: <name>` session name
    ///
    /// The name runs up to the first opening parenthesis and is trimmed.
    ///
    /// # Examples
    ///
    /// ```
    /// use docchat::model::Session;
    ///
    /// let session = Session::new("1", "Chat with: report.pdf (3 pages)");
    /// assert_eq!(session.attached_file_name().as_deref(), Some("report.pdf"));
    ///
    /// let general = Session::new("2", "General chat");
    /// assert!(general.attached_file_name().is_none());
    /// ```
    pub fn attached_file_name(&self) -> Option<String> {
        file_name_pattern()
            .captures(&self.session_name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
    }

    /// Short preview of the first embedded message
    pub fn preview(&self) -> String {
        match self.messages.first() {
            Some(first) => {
                let head: String = first.content.chars().take(PREVIEW_CHARS).collect();
                format!("{}...", head)
            }
            None => "Empty conversation".to_string(),
        }
    }
}
