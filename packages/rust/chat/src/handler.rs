//! Incoming message handling.
//!
//! One handler instance serves many sessions; the store keeps their
//! histories apart. Text messages go through the answer chain and the
//! result post-processor, anything else gets a fixed reply.

use std::sync::Arc;

use tracing::{info, warn};

use ragpipe_pipeline::{AnswerChain, clean};
use ragpipe_shared::{ChatMessage, SessionId};

use crate::session::SessionStore;

/// Reply for message kinds the handler cannot process.
pub const UNSUPPORTED_KIND_REPLY: &str =
    "Sorry, this message format is not supported yet.";

/// An incoming chat event.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Plain text from the user.
    Text(String),
    /// Any other kind (stickers, images, ...), named for logging.
    Other(String),
}

/// Routes messages through the answer chain with per-session history.
pub struct ChatHandler {
    store: Arc<dyn SessionStore>,
    chain: AnswerChain,
}

impl ChatHandler {
    /// Build a handler over an injected session store and chain.
    pub fn new(store: Arc<dyn SessionStore>, chain: AnswerChain) -> Self {
        Self { store, chain }
    }

    /// Handle one incoming event and produce the reply text.
    pub async fn handle(&self, session: &SessionId, incoming: Incoming) -> String {
        match incoming {
            Incoming::Text(text) => self.handle_text(session, text).await,
            Incoming::Other(kind) => {
                warn!(%session, kind, "unsupported message kind");
                UNSUPPORTED_KIND_REPLY.to_string()
            }
        }
    }

    async fn handle_text(&self, session: &SessionId, text: String) -> String {
        self.store.append(session, ChatMessage::user(&text)).await;

        let response = self.chain.answer(&text).await;
        let reply = clean(&response.result.output);

        self.store
            .append(session, ChatMessage::assistant(&reply))
            .await;

        info!(
            %session,
            turns = self.store.history(session).await.len(),
            "reply ready"
        );

        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::session::MemorySessionStore;
    use ragpipe_pipeline::{
        CompletionClient, REFUSAL_MESSAGE, Retriever, Snippet,
    };
    use ragpipe_shared::{MessageRole, Result};

    struct ScriptedClient {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedClient {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|s| (*s).to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.replies
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| ragpipe_shared::RagpipeError::stage("completion", "script empty"))
        }
    }

    struct StaticRetriever {
        snippets: Vec<Snippet>,
    }

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<Snippet>> {
            Ok(self.snippets.iter().take(k).cloned().collect())
        }
    }

    fn handler_with(
        client: Arc<dyn CompletionClient>,
        snippets: Vec<Snippet>,
    ) -> (Arc<MemorySessionStore>, ChatHandler) {
        let store = Arc::new(MemorySessionStore::new());
        let retriever = Arc::new(StaticRetriever { snippets });
        let chain = AnswerChain::new(client, retriever, 10).expect("build chain");
        (store.clone(), ChatHandler::new(store, chain))
    }

    fn hours_snippet() -> Vec<Snippet> {
        vec![Snippet {
            source: "https://example.com/hours".into(),
            text: "Store hours: open 9am to 5pm on weekdays.".into(),
        }]
    }

    #[tokio::test]
    async fn text_message_is_answered_and_recorded() {
        let client = ScriptedClient::new(&[
            "Open 9am to 5pm on weekdays.",
            "Yes. We are open from 9am to 5pm on weekdays. Come by any time!",
            "yes",
        ]);
        let (store, handler) = handler_with(client, hours_snippet());
        let session = SessionId::new();

        let reply = handler
            .handle(&session, Incoming::Text("What are your store hours?".into()))
            .await;

        // The post-processor strips the filler affirmative.
        assert!(!reply.contains("yes."));
        assert!(!reply.contains("Yes."));
        assert!(reply.contains("9am to 5pm"));

        let history = store.history(&session).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].text, reply);
    }

    #[tokio::test]
    async fn question_without_context_gets_the_refusal() {
        let (store, handler) = handler_with(ScriptedClient::new(&[]), vec![]);
        let session = SessionId::new();

        let reply = handler
            .handle(
                &session,
                Incoming::Text("What is the capital of a nonexistent country X?".into()),
            )
            .await;

        assert_eq!(reply, REFUSAL_MESSAGE);
        assert_eq!(store.history(&session).await.len(), 2);
    }

    #[tokio::test]
    async fn unsupported_kind_gets_fixed_reply_without_history() {
        let (store, handler) = handler_with(ScriptedClient::new(&[]), vec![]);
        let session = SessionId::new();

        let reply = handler
            .handle(&session, Incoming::Other("sticker".into()))
            .await;

        assert_eq!(reply, UNSUPPORTED_KIND_REPLY);
        assert!(store.history(&session).await.is_empty());
    }
}
