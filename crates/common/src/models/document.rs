use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bounded, possibly overlapping slice of a document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// An uploaded document with its extracted text and chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub content: String,
    pub content_length: usize,
    pub chunks: Vec<DocumentChunk>,
    pub uploaded_at: DateTime<Utc>,
}

impl StoredDocument {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            content_length: self.content_length,
            chunk_count: self.chunks.len(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Listing view of a stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub content_length: usize,
    pub chunk_count: usize,
    pub uploaded_at: DateTime<Utc>,
}
