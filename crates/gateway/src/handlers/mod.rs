//! API handlers module

pub mod chat;
pub mod conversations;
pub mod documents;
pub mod health;
pub mod insights;
pub mod search;

use serde::Deserialize;

/// Offset pagination for listing endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,

    #[serde(default = "default_page_limit")]
    pub limit: usize,
}

fn default_page_limit() -> usize { 100 }
