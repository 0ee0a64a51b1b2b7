//! SynthesisTalk Common Library
//!
//! Shared code for the SynthesisTalk research assistant including:
//! - Context-augmented reasoning pipeline (classification, planning, steps, synthesis)
//! - LLM and web search provider abstractions
//! - Search result cache with lazy expiry
//! - Conversation and document repositories
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod context;
pub mod errors;
pub mod insights;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod resilience;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use llm::LlmProvider;
pub use search::WebSearchProvider;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat model
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Default number of prior messages fed into a model call
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;
