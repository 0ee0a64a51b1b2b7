//! Chat handlers
//!
//! Provides:
//! - Single chat turns through the research pipeline
//! - Batches of independent turns

use axum::{extract::State, Json};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;
use synthesis_common::{
    context::{BatchItemResult, ResearchRequest, ResearchResponse},
    errors::Result,
};

/// Batch response
#[derive(Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItemResult>,
    pub processed_count: usize,
    pub processing_time_ms: u64,
}

/// Answer one chat turn
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>> {
    let response = state.assistant.respond(request).await?;
    Ok(Json(response))
}

/// Answer several turns; a failing item does not fail the batch
pub async fn batch(
    State(state): State<AppState>,
    Json(requests): Json<Vec<ResearchRequest>>,
) -> Result<Json<BatchResponse>> {
    let start = Instant::now();
    let results = state.assistant.respond_batch(requests).await?;

    let failed = results.iter().filter(|r| !r.success).count();
    tracing::info!(
        processed = results.len(),
        failed,
        "Batch processed"
    );

    Ok(Json(BatchResponse {
        processed_count: results.len(),
        results,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
