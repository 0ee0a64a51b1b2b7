use crate::errors::Result;
use crate::models::{Conversation, ConversationSummary, Message};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Title given to conversations created without one
pub fn default_title() -> String {
    format!("Conversation {}", Utc::now().format("%Y-%m-%d %H:%M"))
}

/// Storage for conversations and their append-only message history
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Create the conversation if absent and return its current state
    async fn create(&self, id: &str, title: Option<String>) -> Result<Conversation>;

    async fn get(&self, id: &str) -> Result<Option<Conversation>>;

    /// Conversations ordered by last activity, newest first
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ConversationSummary>>;

    /// Append a message, creating the conversation on first reference
    async fn append(&self, id: &str, message: Message) -> Result<()>;

    /// The last `n` messages in insertion order; empty for unknown ids
    async fn recent(&self, id: &str, n: usize) -> Result<Vec<Message>>;

    /// Every message in insertion order; empty for unknown ids
    async fn messages(&self, id: &str) -> Result<Vec<Message>>;

    async fn set_title(&self, id: &str, title: String) -> Result<Option<ConversationSummary>>;

    async fn delete(&self, id: &str) -> Result<bool>;

    /// Delete every conversation, returning how many were removed
    async fn clear(&self) -> Result<usize>;

    async fn count(&self) -> Result<usize>;
}

/// Conversations held in process memory
///
/// The map is behind a `RwLock`; each conversation has its own `Mutex` so
/// appends to different conversations never contend.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<String, Arc<Mutex<Conversation>>>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: &str) -> Option<Arc<Mutex<Conversation>>> {
        self.conversations.read().await.get(id).cloned()
    }

    async fn entry_or_create(&self, id: &str, title: Option<String>) -> Arc<Mutex<Conversation>> {
        if let Some(existing) = self.entry(id).await {
            return existing;
        }

        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(conversation_id = %id, "Creating conversation");
                let title = title.unwrap_or_else(default_title);
                Arc::new(Mutex::new(Conversation::new(id, Some(title))))
            })
            .clone()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create(&self, id: &str, title: Option<String>) -> Result<Conversation> {
        let entry = self.entry_or_create(id, title).await;
        let conversation = entry.lock().await;
        Ok(conversation.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        match self.entry(id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ConversationSummary>> {
        let entries: Vec<_> = self.conversations.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            summaries.push(entry.lock().await.summary());
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(summaries.into_iter().skip(skip).take(limit).collect())
    }

    async fn append(&self, id: &str, message: Message) -> Result<()> {
        let entry = self.entry_or_create(id, None).await;
        entry.lock().await.append(message);
        Ok(())
    }

    async fn recent(&self, id: &str, n: usize) -> Result<Vec<Message>> {
        match self.entry(id).await {
            Some(entry) => Ok(entry.lock().await.recent(n).to_vec()),
            None => Ok(Vec::new()),
        }
    }

    async fn messages(&self, id: &str) -> Result<Vec<Message>> {
        match self.entry(id).await {
            Some(entry) => Ok(entry.lock().await.messages.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn set_title(&self, id: &str, title: String) -> Result<Option<ConversationSummary>> {
        let Some(entry) = self.entry(id).await else {
            return Ok(None);
        };

        let mut conversation = entry.lock().await;
        conversation.title = Some(title);
        conversation.updated_at = Utc::now();
        Ok(Some(conversation.summary()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.conversations.write().await.remove(id).is_some())
    }

    async fn clear(&self) -> Result<usize> {
        let mut conversations = self.conversations.write().await;
        let count = conversations.len();
        conversations.clear();
        Ok(count)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.conversations.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_creates_lazily() {
        let repo = InMemoryConversationRepository::new();
        assert!(repo.get("c1").await.unwrap().is_none());

        repo.append("c1", Message::user("hello")).await.unwrap();

        let conversation = repo.get("c1").await.unwrap().unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert!(conversation.title.unwrap().starts_with("Conversation "));
    }

    #[tokio::test]
    async fn test_recent_window() {
        let repo = InMemoryConversationRepository::new();
        for i in 0..12 {
            repo.append("c1", Message::user(format!("m{}", i))).await.unwrap();
        }

        let recent = repo.recent("c1", 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "m2");
        assert_eq!(recent[9].content, "m11");
        assert!(repo.recent("missing", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_keeps_existing_history() {
        let repo = InMemoryConversationRepository::new();
        repo.append("c1", Message::user("first")).await.unwrap();

        let conversation = repo.create("c1", Some("ignored".into())).await.unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert_ne!(conversation.title.as_deref(), Some("ignored"));
    }

    #[tokio::test]
    async fn test_title_delete_and_clear() {
        let repo = InMemoryConversationRepository::new();
        repo.create("a", None).await.unwrap();
        repo.create("b", Some("Bee".into())).await.unwrap();

        let updated = repo.set_title("a", "Renamed".into()).await.unwrap().unwrap();
        assert_eq!(updated.title.as_deref(), Some("Renamed"));
        assert!(repo.set_title("zzz", "x".into()).await.unwrap().is_none());

        let listed = repo.list(0, 10).await.unwrap();
        assert_eq!(listed[0].id, "a");

        assert!(repo.delete("a").await.unwrap());
        assert!(!repo.delete("a").await.unwrap());
        assert_eq!(repo.clear().await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_kept() {
        let repo = Arc::new(InMemoryConversationRepository::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.append("shared", Message::user(format!("m{}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.messages("shared").await.unwrap().len(), 20);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
