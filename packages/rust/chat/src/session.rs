//! Session history storage.
//!
//! Conversation state is held behind [`SessionStore`] and injected into the
//! handler, so swapping in a durable store never touches handler logic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ragpipe_shared::{ChatMessage, SessionId};

/// Per-session message history, keyed by session identifier.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Full message history for a session, oldest first.
    async fn history(&self, session: &SessionId) -> Vec<ChatMessage>;

    /// Append one message to a session's history.
    async fn append(&self, session: &SessionId, message: ChatMessage);
}

/// Process-local store for tests and single-instance deployments.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, Vec<ChatMessage>>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn history(&self, session: &SessionId) -> Vec<ChatMessage> {
        self.sessions
            .lock()
            .await
            .get(session)
            .cloned()
            .unwrap_or_default()
    }

    async fn append(&self, session: &SessionId, message: ChatMessage) {
        self.sessions
            .lock()
            .await
            .entry(session.clone())
            .or_default()
            .push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragpipe_shared::MessageRole;

    #[tokio::test]
    async fn history_starts_empty_and_preserves_order() {
        let store = MemorySessionStore::new();
        let session = SessionId::new();

        assert!(store.history(&session).await.is_empty());

        store.append(&session, ChatMessage::user("first")).await;
        store.append(&session, ChatMessage::assistant("second")).await;

        let history = store.history(&session).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "first");
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].text, "second");
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = MemorySessionStore::new();
        let a = SessionId::new();
        let b = SessionId::new();

        store.append(&a, ChatMessage::user("for a")).await;

        assert_eq!(store.history(&a).await.len(), 1);
        assert!(store.history(&b).await.is_empty());
    }
}
