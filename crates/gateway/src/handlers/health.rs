//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;
use synthesis_common::{
    errors::Result,
    store::{ConversationRepository, DocumentRepository},
    VERSION,
};

#[derive(Serialize)]
pub struct BannerResponse {
    pub message: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub llm_provider: String,
    pub model: String,
    pub features: Features,
    pub stats: StoreStats,
}

#[derive(Serialize)]
pub struct Features {
    pub web_search: bool,
    pub search_caching: bool,
    pub document_chunking: bool,
    pub source_attribution: bool,
    pub conversation_export: bool,
    pub chain_of_thought_reasoning: bool,
}

#[derive(Serialize)]
pub struct StoreStats {
    pub conversations: usize,
    pub documents: usize,
    pub cached_searches: usize,
}

/// Service banner
pub async fn root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: format!("SynthesisTalk Backend v{}", VERSION),
        status: "running".to_string(),
    })
}

/// Liveness plus provider availability and store sizes
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let assistant = &state.assistant;

    let stats = StoreStats {
        conversations: assistant.conversations().count().await?,
        documents: assistant.documents().count().await?,
        cached_searches: assistant.search().cache().len().await,
    };

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.observability.service_name.clone(),
        version: VERSION.to_string(),
        llm_provider: assistant.llm().name().to_string(),
        model: assistant.model().to_string(),
        features: Features {
            web_search: assistant.search().is_enabled(),
            search_caching: true,
            document_chunking: true,
            source_attribution: true,
            conversation_export: true,
            chain_of_thought_reasoning: true,
        },
        stats,
    }))
}
