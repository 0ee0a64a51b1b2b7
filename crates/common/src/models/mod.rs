//! Domain models shared across the SynthesisTalk crates

mod conversation;
mod document;
mod reasoning;
mod search;

pub use conversation::{Conversation, ConversationSummary, Message, Role};
pub use document::{DocumentChunk, DocumentSummary, StoredDocument};
pub use reasoning::{PlanStep, QueryType, ReasoningStep, StepAction, ERROR_SOURCE};
pub use search::SearchResult;
