//! SynthesisTalk Document Ingestion
//!
//! Provides:
//! - Boundary-aware text chunking with bounded overlap
//! - PDF and plain-text extraction
//! - `DocumentProcessor` for validating, chunking and storing uploads

pub mod chunker;
pub mod errors;
pub mod pdf;
pub mod processor;

pub use chunker::{chunk_text, ChunkingConfig};
pub use errors::IngestionError;
pub use processor::{DocumentProcessor, DocumentResponse, DocumentUpload, ProcessingOptions};
