//! Research pipeline
//!
//! Components, leaf first:
//! - Query classification
//! - Reasoning plan generation
//! - Step execution against the LLM
//! - Response synthesis
//! - Source attribution
//! - Conversation context windowing
//! - The orchestrating `ResearchAssistant`

mod attribution;
mod classifier;
mod executor;
mod orchestrator;
mod planner;
mod synthesizer;
mod window;

pub use attribution::{LexicalAttributor, SourceAttributor, KNOWLEDGE_BASE_SOURCE};
pub use classifier::{QueryAnalysis, QueryClassifier};
pub use executor::{StepExecutor, StepInputs, DOCUMENT_SOURCE, KNOWLEDGE_SOURCE, WEB_SOURCE};
pub use orchestrator::{
    BatchItemResult, ResearchAssistant, ResearchRequest, ResearchResponse, ResponseMetadata,
    SearchStatus, INLINE_DOCUMENT_LABEL,
};
pub use planner::ReasoningPlanner;
pub use synthesizer::{ResponseSynthesizer, SynthesisOutcome, SynthesisStatus};
pub use window::ConversationContextWindow;
