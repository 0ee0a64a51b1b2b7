//! Conversation Context Window - Selects prior turns for a model call

use crate::errors::Result;
use crate::models::Message;
use crate::store::ConversationRepository;
use std::sync::Arc;

/// Resolves the model-visible context for a conversation
#[derive(Clone)]
pub struct ConversationContextWindow {
    conversations: Arc<dyn ConversationRepository>,
    size: usize,
}

impl ConversationContextWindow {
    pub fn new(conversations: Arc<dyn ConversationRepository>, size: usize) -> Self {
        Self { conversations, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The caller's context when one is given, otherwise the last `size` stored turns
    ///
    /// An explicit context replaces the stored window entirely. An empty
    /// explicit list counts as absent.
    pub async fn resolve(&self, conversation_id: &str, explicit: &[Message]) -> Result<Vec<Message>> {
        if !explicit.is_empty() {
            return Ok(explicit.to_vec());
        }
        self.conversations.recent(conversation_id, self.size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryConversationRepository;

    async fn seeded(count: usize) -> Arc<InMemoryConversationRepository> {
        let repo = Arc::new(InMemoryConversationRepository::new());
        for i in 0..count {
            repo.append("c1", Message::user(format!("m{}", i))).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_default_window_is_last_n() {
        let window = ConversationContextWindow::new(seeded(14).await, 10);
        let context = window.resolve("c1", &[]).await.unwrap();

        assert_eq!(context.len(), 10);
        assert_eq!(context.first().unwrap().content, "m4");
        assert_eq!(context.last().unwrap().content, "m13");
    }

    #[tokio::test]
    async fn test_explicit_context_replaces_window() {
        let window = ConversationContextWindow::new(seeded(3).await, 10);
        let explicit = vec![Message::user("only this")];

        let context = window.resolve("c1", &explicit).await.unwrap();

        assert_eq!(context, explicit);
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_empty() {
        let window = ConversationContextWindow::new(seeded(0).await, 10);
        assert!(window.resolve("nobody", &[]).await.unwrap().is_empty());
    }
}
