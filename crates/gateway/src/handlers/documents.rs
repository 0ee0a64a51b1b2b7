//! Document management handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::Pagination;
use crate::AppState;
use synthesis_common::{
    errors::{AppError, Result},
    models::{DocumentSummary, StoredDocument},
    store::DocumentRepository,
};
use synthesis_ingestion::{DocumentResponse, DocumentUpload, ProcessingOptions};

/// Upload query parameters
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default = "default_enable_chunking")]
    pub enable_chunking: bool,

    /// Overrides the configured chunk size
    pub chunk_size: Option<usize>,
}

fn default_enable_chunking() -> bool { true }

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total_documents: usize,
}

#[derive(Serialize)]
pub struct DeleteDocumentResponse {
    pub message: String,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation {
            message: e.body_text(),
            field: Some("file".to_string()),
        }
    } else {
        AppError::InvalidFormat { message: e.body_text() }
    }
}

/// Upload a PDF or text file as multipart field `file`
pub async fn upload_document(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::MissingField { field: "filename".to_string() })?;
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        upload = Some(DocumentUpload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| AppError::MissingField { field: "file".to_string() })?;
    let options = ProcessingOptions {
        enable_chunking: params.enable_chunking,
        chunk_size: params.chunk_size,
    };

    let response = state.processor.process(upload, options).await?;
    Ok(Json(response))
}

/// List stored documents in upload order
pub async fn list_documents(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<DocumentListResponse>> {
    let documents = state.assistant.documents();

    Ok(Json(DocumentListResponse {
        documents: documents.list(page.skip, page.limit).await?,
        total_documents: documents.count().await?,
    }))
}

/// Full document including extracted text and chunks
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredDocument>> {
    let document = state
        .assistant
        .documents()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::DocumentNotFound { id: id.clone() })?;

    Ok(Json(StoredDocument::clone(&document)))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteDocumentResponse>> {
    let document = state
        .assistant
        .documents()
        .delete(&id)
        .await?
        .ok_or_else(|| AppError::DocumentNotFound { id: id.clone() })?;

    tracing::info!(document_id = %document.id, "Document deleted");

    Ok(Json(DeleteDocumentResponse {
        message: format!("Document {} deleted successfully", document.filename),
    }))
}
