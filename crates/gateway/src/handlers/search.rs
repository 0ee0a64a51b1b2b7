//! Web search and search cache handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use synthesis_common::{
    cache::CacheStats,
    errors::Result,
    models::SearchResult,
};

/// Search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    #[serde(default = "default_max_results")]
    #[validate(range(min = 1, max = 20))]
    pub max_results: usize,
}

fn default_max_results() -> usize { 5 }

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub cached: bool,
}

#[derive(Serialize)]
pub struct ClearCacheResponse {
    pub message: String,
    pub items_cleared: usize,
}

#[derive(Serialize)]
pub struct CacheStatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// `hit_potential` rendered for display, e.g. "75.0%"
    pub cache_hit_potential: String,
}

/// Standalone cache-backed web search; 503 when search is disabled
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    request.validate()?;

    let outcome = state
        .assistant
        .search()
        .search(&request.query, request.max_results)
        .await?;

    tracing::info!(
        result_count = outcome.results.len(),
        cached = outcome.cached,
        "Search completed"
    );

    Ok(Json(SearchResponse {
        query: request.query,
        results: outcome.results,
        cached: outcome.cached,
    }))
}

/// Drop every cached search
pub async fn clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let items_cleared = state.assistant.search().cache().clear().await;
    tracing::info!(items_cleared, "Search cache cleared");

    Json(ClearCacheResponse {
        message: "Search cache cleared successfully".to_string(),
        items_cleared,
    })
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let stats = state.assistant.search().cache().stats().await;
    Json(CacheStatsResponse {
        cache_hit_potential: format!("{:.1}%", stats.hit_potential),
        stats,
    })
}
