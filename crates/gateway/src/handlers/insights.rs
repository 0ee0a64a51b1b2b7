//! Summary and visualization handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use synthesis_common::{
    errors::Result,
    insights::{SummaryFormat, SummaryReport, VisualizationKind, VisualizationReport},
};

#[derive(Debug, Deserialize, Validate)]
pub struct SummaryRequest {
    #[validate(length(min = 1, max = 256))]
    pub conversation_id: String,

    #[serde(default = "default_summary_format")]
    pub format_type: SummaryFormat,
}

fn default_summary_format() -> SummaryFormat { SummaryFormat::Bullet }

#[derive(Debug, Deserialize, Validate)]
pub struct VisualizationRequest {
    #[validate(length(min = 1, max = 256))]
    pub conversation_id: String,

    pub visualization_type: VisualizationKind,
}

/// One selectable option in a catalogue listing
#[derive(Serialize)]
pub struct CatalogueEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<CatalogueEntry>,
}

#[derive(Serialize)]
pub struct TypesResponse {
    pub types: Vec<CatalogueEntry>,
}

/// Summarize a stored conversation; model failures come back flagged `degraded`
pub async fn generate_summary(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<SummaryReport>> {
    request.validate()?;

    let report = state
        .insights
        .summarize(&request.conversation_id, request.format_type)
        .await?;

    Ok(Json(report))
}

pub async fn summary_formats() -> Json<FormatsResponse> {
    Json(FormatsResponse {
        formats: SummaryFormat::ALL
            .iter()
            .map(|f| CatalogueEntry {
                id: f.id(),
                name: f.name(),
                description: f.description(),
            })
            .collect(),
    })
}

/// Structured visualization data for a stored conversation
pub async fn generate_visualization(
    State(state): State<AppState>,
    Json(request): Json<VisualizationRequest>,
) -> Result<Json<VisualizationReport>> {
    request.validate()?;

    let report = state
        .insights
        .visualize(&request.conversation_id, request.visualization_type)
        .await?;

    Ok(Json(report))
}

pub async fn visualization_types() -> Json<TypesResponse> {
    Json(TypesResponse {
        types: VisualizationKind::ALL
            .iter()
            .map(|k| CatalogueEntry {
                id: k.id(),
                name: k.name(),
                description: k.description(),
            })
            .collect(),
    })
}
