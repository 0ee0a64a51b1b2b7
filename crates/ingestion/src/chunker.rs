//! Text chunking module
//!
//! Splits extracted document text into bounded, overlapping chunks that
//! prefer to end on a sentence or line boundary.

use crate::errors::IngestionError;
use synthesis_common::config::DocumentsConfig;
use synthesis_common::models::DocumentChunk;
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
        }
    }
}

impl From<&DocumentsConfig> for ChunkingConfig {
    fn from(config: &DocumentsConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

impl ChunkingConfig {
    /// Same overlap, different target size
    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        Self { chunk_size, ..self }
    }
}

/// Split text into chunks.
///
/// Text no longer than `chunk_size` comes back untouched as a single chunk.
/// Longer text is cut into windows of `chunk_size` characters; a window that
/// stops short of the end is pulled back to the last '.' or '\n' when that
/// boundary lies in its second half. Chunks are trimmed and empty ones are
/// dropped. Each window starts `chunk_overlap` characters before the previous
/// one ended, but always strictly after the previous start, so the tail of the
/// text can appear in more than one chunk.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<DocumentChunk>, IngestionError> {
    let chunk_size = config.chunk_size;
    if chunk_size == 0 {
        return Err(IngestionError::InvalidChunkSize(chunk_size));
    }

    let chars: Vec<char> = text.chars().collect();
    let total_len = chars.len();

    if total_len <= chunk_size {
        return Ok(vec![make_chunk(0, text.to_string())]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_len {
        let mut end = (start + chunk_size).min(total_len);

        if end < total_len {
            if let Some(break_point) = last_boundary(&chars[start..end]).map(|offset| start + offset) {
                if break_point >= start + chunk_size / 2 {
                    end = break_point + 1;
                }
            }
        }

        let content: String = chars[start..end].iter().collect();
        let content = content.trim();
        if !content.is_empty() {
            chunks.push(make_chunk(chunks.len(), content.to_string()));
        }

        let next_start = end.saturating_sub(config.chunk_overlap);
        start = if next_start <= start { end } else { next_start };
    }

    let total_chunks = chunks.len();
    for chunk in &mut chunks {
        chunk.total_chunks = total_chunks;
    }

    debug!(
        input_chars = total_len,
        chunk_count = total_chunks,
        chunk_size,
        chunk_overlap = config.chunk_overlap,
        "Text chunked"
    );

    Ok(chunks)
}

/// Position of the last sentence or line break within a window
fn last_boundary(window: &[char]) -> Option<usize> {
    window.iter().rposition(|c| *c == '.' || *c == '\n')
}

fn make_chunk(index: usize, content: String) -> DocumentChunk {
    DocumentChunk {
        chunk_id: format!("chunk_{}", index),
        content,
        chunk_index: index,
        total_chunks: 1,
    }
}
