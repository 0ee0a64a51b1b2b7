//! Ingestion error types

use synthesis_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("PDF parse error for {filename}: {message}")]
    PdfParse { filename: String, message: String },

    #[error("File '{filename}' is not valid UTF-8 text")]
    InvalidEncoding { filename: String },

    #[error("Unsupported file type '{content_type}'")]
    UnsupportedType { content_type: String },

    #[error("No text content found in the document '{filename}'")]
    Empty { filename: String },

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Chunk size must be positive, got {0}")]
    InvalidChunkSize(usize),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::UnsupportedType { content_type } => {
                AppError::UnsupportedDocumentType { content_type }
            }
            IngestionError::Empty { filename } => AppError::EmptyDocument { filename },
            IngestionError::TooLarge { size, limit } => AppError::PayloadTooLarge { size, limit },
            IngestionError::InvalidChunkSize(_) => AppError::Validation {
                message: e.to_string(),
                field: Some("chunk_size".to_string()),
            },
            IngestionError::PdfParse { .. } | IngestionError::InvalidEncoding { .. } => {
                AppError::InvalidFormat { message: e.to_string() }
            }
            IngestionError::Storage(message) => AppError::Internal { message },
        }
    }
}

impl From<AppError> for IngestionError {
    fn from(e: AppError) -> Self {
        IngestionError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_rejections_map_to_bad_request() {
        let err: AppError = IngestionError::UnsupportedType {
            content_type: "image/png".into(),
        }
        .into();
        assert_eq!(err.status_code().as_u16(), 400);

        let err: AppError = IngestionError::Empty { filename: "blank.txt".into() }.into();
        assert!(matches!(err, AppError::EmptyDocument { .. }));
    }

    #[test]
    fn test_size_limit_maps_to_payload_too_large() {
        let err: AppError = IngestionError::TooLarge { size: 10, limit: 5 }.into();
        assert_eq!(err.status_code().as_u16(), 413);
    }
}
