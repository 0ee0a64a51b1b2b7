//! Conversation insights
//!
//! Provides:
//! - Structured summaries (bullet, executive, academic)
//! - Visualization data (concept map, timeline, comparison chart)
//!
//! Model failures degrade to a readable fallback instead of an error.

mod summary;
mod visualization;

pub use summary::{SummaryFormat, SummaryGenerator};
pub use visualization::{extract_json, VisualizationGenerator, VisualizationKind};

use crate::errors::{AppError, Result};
use crate::llm::LlmProvider;
use crate::models::{Message, Role};
use crate::store::ConversationRepository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Result of a generation that may have fallen back
#[derive(Debug, Clone, PartialEq)]
pub enum InsightOutcome<T> {
    Completed(T),
    Degraded { fallback: T, error: String },
}

impl<T> InsightOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, InsightOutcome::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            InsightOutcome::Completed(value) => value,
            InsightOutcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            InsightOutcome::Completed(value) => value,
            InsightOutcome::Degraded { fallback, .. } => fallback,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub conversation_id: String,
    pub format: SummaryFormat,
    pub summary: String,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualizationReport {
    pub conversation_id: String,
    pub visualization_type: VisualizationKind,
    pub data: serde_json::Value,
    pub generated_at: DateTime<Utc>,
    pub degraded: bool,
}

/// Summaries and visualizations over stored conversations
#[derive(Clone)]
pub struct InsightService {
    summaries: Arc<SummaryGenerator>,
    visualizations: Arc<VisualizationGenerator>,
    conversations: Arc<dyn ConversationRepository>,
}

impl InsightService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        conversations: Arc<dyn ConversationRepository>,
    ) -> Self {
        let model = model.into();
        Self {
            summaries: Arc::new(SummaryGenerator::new(llm.clone(), model.clone())),
            visualizations: Arc::new(VisualizationGenerator::new(llm, model)),
            conversations,
        }
    }

    pub async fn summarize(&self, conversation_id: &str, format: SummaryFormat) -> Result<SummaryReport> {
        let messages = self.messages(conversation_id).await?;
        let outcome = self.summaries.generate(format, &messages).await;

        Ok(SummaryReport {
            conversation_id: conversation_id.to_string(),
            format,
            degraded: outcome.is_degraded(),
            summary: outcome.into_value(),
        })
    }

    pub async fn visualize(
        &self,
        conversation_id: &str,
        kind: VisualizationKind,
    ) -> Result<VisualizationReport> {
        let messages = self.messages(conversation_id).await?;
        let outcome = self.visualizations.generate(kind, &messages).await;

        Ok(VisualizationReport {
            conversation_id: conversation_id.to_string(),
            visualization_type: kind,
            degraded: outcome.is_degraded(),
            data: outcome.into_value(),
            generated_at: Utc::now(),
        })
    }

    /// Messages of an existing, non-empty conversation
    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let conversation = self
            .conversations
            .get(conversation_id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound { id: conversation_id.to_string() })?;

        if conversation.messages.is_empty() {
            return Err(AppError::Validation {
                message: "No messages in conversation".to_string(),
                field: None,
            });
        }
        Ok(conversation.messages)
    }
}

/// Render messages as a plain transcript
pub(crate) fn transcript(messages: &[Message], with_sources: bool) -> String {
    let mut content = String::new();
    for message in messages {
        let speaker = match message.role {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        };
        content.push_str(&format!("\n{}: {}\n", speaker, message.content));

        if with_sources {
            if let Some(sources) = message.sources.as_ref().filter(|s| !s.is_empty()) {
                content.push_str(&format!("Sources: {}\n", sources.join(", ")));
            }
        }
    }
    content
}
