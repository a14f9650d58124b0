//! Core domain types for ragpipe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PageRecord
// ---------------------------------------------------------------------------

/// One crawled page, immutable once emitted.
///
/// Serialized field names match the dataset wire format exactly
/// (`URL`/`Title`/`Content`, one JSON object per line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Page URL as visited.
    #[serde(rename = "URL")]
    pub url: String,
    /// Page title, or the extractor's placeholder when the page has none.
    #[serde(rename = "Title")]
    pub title: String,
    /// Cleaned textual content of the page.
    #[serde(rename = "Content")]
    pub content: String,
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for chat session identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One turn in a chat session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: MessageRole,
    /// Message text.
    pub text: String,
    /// When the message was recorded.
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a user-authored message stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Build an assistant-authored message stamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_roundtrip() {
        let id = SessionId::new();
        let s = id.to_string();
        let parsed: SessionId = s.parse().expect("parse SessionId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn page_record_uses_wire_field_names() {
        let record = PageRecord {
            url: "https://example.com/".into(),
            title: "Example".into(),
            content: "Hello world".into(),
        };

        let json = serde_json::to_value(&record).expect("serialize");
        let obj = json.as_object().expect("object");
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["Content", "Title", "URL"]);

        let parsed: PageRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, record);
    }

    #[test]
    fn chat_message_constructors_set_roles() {
        let user = ChatMessage::user("hi");
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.text, "hi");

        let bot = ChatMessage::assistant("hello");
        assert_eq!(bot.role, MessageRole::Assistant);
    }
}
