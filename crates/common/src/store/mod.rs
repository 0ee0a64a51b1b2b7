//! Conversation and document repositories
//!
//! Provides:
//! - Repository traits consumed by the pipeline and the HTTP layer
//! - In-memory implementations behind explicit synchronization
//! - Per-key request serialization (`KeyedLocks`)

mod conversations;
mod documents;
mod locks;

pub use conversations::{default_title, ConversationRepository, InMemoryConversationRepository};
pub use documents::{DocumentRepository, InMemoryDocumentRepository};
pub use locks::KeyedLocks;
