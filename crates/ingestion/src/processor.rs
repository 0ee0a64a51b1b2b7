//! Document processor
//!
//! Core logic for uploaded documents: type detection, text extraction,
//! chunking, and persistence into the document repository.

use crate::chunker::{chunk_text, ChunkingConfig};
use crate::errors::IngestionError;
use crate::pdf::extract_text_from_pdf;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use synthesis_common::config::DocumentsConfig;
use synthesis_common::metrics;
use synthesis_common::models::StoredDocument;
use synthesis_common::store::DocumentRepository;
use tracing::{info, instrument};

const PDF_MIME: &str = "application/pdf";
const TEXT_MIME: &str = "text/plain";

/// Raw upload as received from the client
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    /// Declared MIME type, if the client sent one
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Per-upload processing switches
#[derive(Debug, Clone, Copy)]
pub struct ProcessingOptions {
    pub enable_chunking: bool,
    /// Overrides the configured chunk size
    pub chunk_size: Option<usize>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            enable_chunking: true,
            chunk_size: None,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub document_id: String,
    pub filename: String,
    pub content_length: usize,
    pub chunks_created: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Text,
}

/// Decide how to read an upload from its declared type and filename
fn detect_kind(filename: &str, content_type: Option<&str>) -> Result<DocumentKind, IngestionError> {
    let name = filename.to_lowercase();
    let mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_lowercase())
        .unwrap_or_default();

    if mime == PDF_MIME || name.ends_with(".pdf") {
        Ok(DocumentKind::Pdf)
    } else if mime.starts_with("text/") || name.ends_with(".txt") {
        Ok(DocumentKind::Text)
    } else {
        Err(IngestionError::UnsupportedType {
            content_type: if mime.is_empty() { filename.to_string() } else { mime },
        })
    }
}

/// Short stable identifier derived from the filename and upload time
fn document_id(filename: &str) -> String {
    let digest = Sha256::digest(format!("{}_{}", filename, Utc::now().to_rfc3339()).as_bytes());
    hex::encode(digest)[..12].to_string()
}

/// Turns uploads into stored, optionally chunked documents
pub struct DocumentProcessor {
    documents: Arc<dyn DocumentRepository>,
    chunking: ChunkingConfig,
    max_upload_bytes: usize,
}

impl DocumentProcessor {
    pub fn new(config: &DocumentsConfig, documents: Arc<dyn DocumentRepository>) -> Self {
        Self {
            documents,
            chunking: ChunkingConfig::from(config),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Extract, chunk and store one upload
    #[instrument(skip(self, upload), fields(filename = %upload.filename, size = upload.bytes.len()))]
    pub async fn process(
        &self,
        upload: DocumentUpload,
        options: ProcessingOptions,
    ) -> Result<DocumentResponse, IngestionError> {
        let started = Instant::now();

        if upload.bytes.len() > self.max_upload_bytes {
            return Err(IngestionError::TooLarge {
                size: upload.bytes.len(),
                limit: self.max_upload_bytes,
            });
        }

        let kind = detect_kind(&upload.filename, upload.content_type.as_deref())?;
        let (text, content_type) = match kind {
            DocumentKind::Pdf => (
                extract_text_from_pdf(&upload.filename, &upload.bytes)?,
                PDF_MIME.to_string(),
            ),
            DocumentKind::Text => {
                let text = String::from_utf8(upload.bytes).map_err(|_| IngestionError::InvalidEncoding {
                    filename: upload.filename.clone(),
                })?;
                let content_type = upload
                    .content_type
                    .filter(|ct| ct.starts_with("text/"))
                    .unwrap_or_else(|| TEXT_MIME.to_string());
                (text, content_type)
            }
        };

        if text.trim().is_empty() {
            return Err(IngestionError::Empty { filename: upload.filename });
        }

        let chunks = if options.enable_chunking {
            let config = match options.chunk_size {
                Some(size) => self.chunking.with_chunk_size(size),
                None => self.chunking,
            };
            chunk_text(&text, &config)?
        } else {
            Vec::new()
        };

        let document = StoredDocument {
            id: document_id(&upload.filename),
            filename: upload.filename,
            content_type,
            content_length: text.chars().count(),
            content: text,
            chunks,
            uploaded_at: Utc::now(),
        };

        let response = DocumentResponse {
            document_id: document.id.clone(),
            filename: document.filename.clone(),
            content_length: document.content_length,
            chunks_created: document.chunks.len(),
            message: format!(
                "Document '{}' uploaded and processed successfully",
                document.filename
            ),
        };

        metrics::record_ingestion(
            started.elapsed().as_secs_f64(),
            response.chunks_created,
            &document.content_type,
        );

        self.documents.insert(document).await?;

        info!(
            document_id = %response.document_id,
            content_length = response.content_length,
            chunks_created = response.chunks_created,
            "Document ingested"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthesis_common::store::InMemoryDocumentRepository;

    fn processor(max_upload_bytes: usize) -> (DocumentProcessor, Arc<InMemoryDocumentRepository>) {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let config = DocumentsConfig {
            chunk_size: 2000,
            chunk_overlap: 200,
            max_upload_bytes,
        };
        (DocumentProcessor::new(&config, repo.clone()), repo)
    }

    fn text_upload(filename: &str, body: &str) -> DocumentUpload {
        DocumentUpload {
            filename: filename.to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind("paper.PDF", None).unwrap(), DocumentKind::Pdf);
        assert_eq!(detect_kind("blob", Some("application/pdf")).unwrap(), DocumentKind::Pdf);
        assert_eq!(detect_kind("notes", Some("text/markdown; charset=utf-8")).unwrap(), DocumentKind::Text);
        assert_eq!(detect_kind("notes.txt", Some("application/octet-stream")).unwrap(), DocumentKind::Text);
        assert!(matches!(
            detect_kind("image.png", Some("image/png")),
            Err(IngestionError::UnsupportedType { ref content_type }) if content_type == "image/png"
        ));
    }

    #[test]
    fn test_document_id_is_twelve_hex_chars() {
        let id = document_id("paper.pdf");
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_text_upload_is_stored_with_chunks() {
        let (processor, repo) = processor(1024 * 1024);
        let body = "A sentence about retrieval.\n".repeat(200);

        let response = processor
            .process(text_upload("notes.txt", &body), ProcessingOptions::default())
            .await
            .unwrap();

        assert_eq!(response.filename, "notes.txt");
        assert_eq!(response.content_length, body.chars().count());
        assert!(response.chunks_created > 1);
        assert!(response.message.contains("notes.txt"));

        let stored = repo.get(&response.document_id).await.unwrap().unwrap();
        assert_eq!(stored.content, body);
        assert_eq!(stored.content_type, "text/plain");
        assert_eq!(stored.chunks.len(), response.chunks_created);
    }

    #[tokio::test]
    async fn test_chunking_can_be_disabled_or_resized() {
        let (processor, _) = processor(1024 * 1024);
        let body = "word ".repeat(1000);

        let unchunked = processor
            .process(
                text_upload("a.txt", &body),
                ProcessingOptions { enable_chunking: false, chunk_size: None },
            )
            .await
            .unwrap();
        assert_eq!(unchunked.chunks_created, 0);

        let small = processor
            .process(
                text_upload("b.txt", &body),
                ProcessingOptions { enable_chunking: true, chunk_size: Some(500) },
            )
            .await
            .unwrap();
        assert!(small.chunks_created >= 10);
    }

    #[tokio::test]
    async fn test_rejections() {
        let (processor, repo) = processor(64);

        let err = tokio_test::assert_err!(
            processor
                .process(text_upload("blank.txt", "   \n  "), ProcessingOptions::default())
                .await
        );
        assert!(matches!(err, IngestionError::Empty { .. }));

        let err = processor
            .process(
                DocumentUpload {
                    filename: "photo.jpg".into(),
                    content_type: Some("image/jpeg".into()),
                    bytes: vec![0xff, 0xd8],
                },
                ProcessingOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedType { .. }));

        let err = processor
            .process(text_upload("big.txt", &"x".repeat(65)), ProcessingOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::TooLarge { size: 65, limit: 64 }));

        let err = processor
            .process(
                DocumentUpload {
                    filename: "bad.txt".into(),
                    content_type: None,
                    bytes: vec![0xc3, 0x28],
                },
                ProcessingOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::InvalidEncoding { .. }));

        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
