use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReasoningStep;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    pub content: String,

    /// When the turn was recorded; caller-supplied context may omit it
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Source labels attributed to an assistant turn
    #[serde(default)]
    pub sources: Option<Vec<String>>,

    /// Reasoning steps behind an assistant turn
    #[serde(default)]
    pub reasoning_steps: Option<Vec<ReasoningStep>>,
}

impl Message {
    /// A user turn stamped with the current time
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(Utc::now()),
            sources: None,
            reasoning_steps: None,
        }
    }

    /// An assistant turn stamped with the current time
    pub fn assistant(
        content: impl Into<String>,
        sources: Vec<String>,
        reasoning_steps: Vec<ReasoningStep>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Some(Utc::now()),
            sources: Some(sources),
            reasoning_steps: Some(reasoning_steps),
        }
    }
}

/// An append-only sequence of messages under one id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// The last `n` messages in insertion order
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Listing view of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_keeps_insertion_order() {
        let mut conversation = Conversation::new("c1", None);
        for i in 0..5 {
            conversation.append(Message::user(format!("turn {}", i)));
        }

        let recent: Vec<&str> = conversation.recent(3).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(recent, vec!["turn 2", "turn 3", "turn 4"]);
        assert_eq!(conversation.recent(50).len(), 5);
        assert!(conversation.recent(0).is_empty());
    }

    #[test]
    fn test_role_wire_format() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert!(json.contains("\"role\":\"user\""));

        let parsed: Message = serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(parsed.role, Role::Assistant);
        assert!(parsed.timestamp.is_none());
        assert!(parsed.sources.is_none());
    }
}
