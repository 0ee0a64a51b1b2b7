//! Conversation management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Pagination;
use crate::AppState;
use synthesis_common::{
    errors::{AppError, Result},
    models::{Conversation, ConversationSummary, Message, Role},
    store::ConversationRepository,
};

/// Titles longer than this are cut down by auto-titling
const MAX_AUTO_TITLE_CHARS: usize = 50;
const AUTO_TITLE_KEEP_CHARS: usize = 47;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConversationParams {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTitleParams {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
    pub total_conversations: usize,
}

#[derive(Serialize)]
pub struct ConversationDetail {
    pub conversation_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub messages: Vec<Message>,
}

impl From<Conversation> for ConversationDetail {
    fn from(conversation: Conversation) -> Self {
        Self {
            conversation_id: conversation.id,
            title: conversation.title,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            message_count: conversation.messages.len(),
            messages: conversation.messages,
        }
    }
}

/// Existence and size of a conversation; never 404s
#[derive(Serialize)]
pub struct ConversationState {
    pub exists: bool,
    pub conversation_id: String,
    pub message_count: usize,
    pub title: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Timestamp of the newest message
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub deleted_count: usize,
}

#[derive(Serialize)]
pub struct AutoTitleResponse {
    pub conversation_id: String,
    pub title: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ConversationExport {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub export_time: DateTime<Utc>,
    pub metadata: ExportMetadata,
}

#[derive(Serialize)]
pub struct ExportMetadata {
    pub message_count: usize,
    pub title: Option<String>,
}

async fn load(state: &AppState, id: &str) -> Result<Conversation> {
    state
        .assistant
        .conversations()
        .get(id)
        .await?
        .ok_or_else(|| AppError::ConversationNotFound { id: id.to_string() })
}

/// Title derived from the first user message
fn title_from_message(content: &str) -> String {
    let content = content.trim();
    if content.chars().count() > MAX_AUTO_TITLE_CHARS {
        let head: String = content.chars().take(AUTO_TITLE_KEEP_CHARS).collect();
        format!("{}.", head)
    } else {
        content.to_string()
    }
}

/// Conversations, most recently active first
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<ConversationListResponse>> {
    let conversations = state.assistant.conversations();

    Ok(Json(ConversationListResponse {
        conversations: conversations.list(page.skip, page.limit).await?,
        total_conversations: conversations.count().await?,
    }))
}

/// Start a new conversation with a time-based id
pub async fn create_conversation(
    State(state): State<AppState>,
    Query(params): Query<CreateConversationParams>,
) -> Result<(StatusCode, Json<ConversationSummary>)> {
    params.validate()?;

    let id = format!("conversation_{}", Utc::now().timestamp_millis());
    let conversation = state.assistant.conversations().create(&id, params.title).await?;

    tracing::info!(conversation_id = %id, "Conversation created");

    Ok((StatusCode::CREATED, Json(conversation.summary())))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetail>> {
    let conversation = load(&state, &id).await?;
    Ok(Json(conversation.into()))
}

pub async fn update_title(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<UpdateTitleParams>,
) -> Result<Json<ConversationSummary>> {
    params.validate()?;

    let summary = state
        .assistant
        .conversations()
        .set_title(&id, params.title)
        .await?
        .ok_or_else(|| AppError::ConversationNotFound { id: id.clone() })?;

    Ok(Json(summary))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.assistant.conversations().delete(&id).await? {
        return Err(AppError::ConversationNotFound { id });
    }

    tracing::info!(conversation_id = %id, "Conversation deleted");

    Ok(Json(MessageResponse {
        message: format!("Conversation {} deleted successfully", id),
    }))
}

/// Delete every conversation
pub async fn clear_conversations(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let deleted_count = state.assistant.conversations().clear().await?;
    tracing::info!(deleted_count, "All conversations cleared");

    Ok(Json(ClearResponse {
        message: "All conversations cleared successfully".to_string(),
        deleted_count,
    }))
}

pub async fn conversation_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationState>> {
    let state = match state.assistant.conversations().get(&id).await? {
        Some(conversation) => ConversationState {
            exists: true,
            message_count: conversation.messages.len(),
            last_activity: conversation.messages.iter().rev().find_map(|m| m.timestamp),
            conversation_id: conversation.id,
            title: conversation.title,
            created_at: Some(conversation.created_at),
            updated_at: Some(conversation.updated_at),
        },
        None => ConversationState {
            exists: false,
            conversation_id: id,
            message_count: 0,
            title: None,
            created_at: None,
            updated_at: None,
            last_activity: None,
        },
    };

    Ok(Json(state))
}

/// Title the conversation after its first user message
pub async fn auto_title(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AutoTitleResponse>> {
    let conversation = load(&state, &id).await?;

    if conversation.messages.is_empty() {
        return Err(AppError::Validation {
            message: "No messages in conversation".to_string(),
            field: None,
        });
    }

    let first_user = conversation
        .messages
        .iter()
        .find(|m| m.role == Role::User)
        .ok_or_else(|| AppError::Validation {
            message: "No user messages found".to_string(),
            field: None,
        })?;

    let title = title_from_message(&first_user.content);
    state
        .assistant
        .conversations()
        .set_title(&id, title.clone())
        .await?
        .ok_or_else(|| AppError::ConversationNotFound { id: id.clone() })?;

    Ok(Json(AutoTitleResponse {
        conversation_id: id,
        title,
        message: "Title generated successfully".to_string(),
    }))
}

/// Full message history as a downloadable JSON document
pub async fn export_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationExport>> {
    let conversation = load(&state, &id).await?;

    Ok(Json(ConversationExport {
        metadata: ExportMetadata {
            message_count: conversation.messages.len(),
            title: conversation.title,
        },
        conversation_id: conversation.id,
        messages: conversation.messages,
        export_time: Utc::now(),
    }))
}
