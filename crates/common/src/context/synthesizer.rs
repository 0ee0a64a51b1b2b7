//! Response Synthesizer - Folds executed steps into one answer
//!
//! Provides:
//! - Synthesis prompt enumerating every step
//! - Typed outcome separating completed from degraded answers

use crate::config::ReasoningConfig;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::models::ReasoningStep;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

const SYNTHESIS_SYSTEM_PROMPT: &str =
    "You are synthesizing multi-step reasoning into a comprehensive response.";

const SYNTHESIS_INSTRUCTIONS: &str = "
Now provide a comprehensive, well-structured final answer that incorporates insights from all reasoning steps.
Make sure to:
1. Directly answer the original query
2. Reference key insights from your step-by-step analysis
3. Maintain logical flow and coherence
4. Include relevant examples or evidence where appropriate
";

/// Result of a synthesis call
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    /// The model produced the answer
    Completed(String),
    /// The call failed; `answer` is a readable error description
    Degraded { answer: String, error: String },
}

impl SynthesisOutcome {
    /// Text shown to the user either way
    pub fn answer(&self) -> &str {
        match self {
            SynthesisOutcome::Completed(answer) => answer,
            SynthesisOutcome::Degraded { answer, .. } => answer,
        }
    }

    pub fn into_answer(self) -> String {
        match self {
            SynthesisOutcome::Completed(answer) => answer,
            SynthesisOutcome::Degraded { answer, .. } => answer,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SynthesisOutcome::Degraded { .. })
    }

    pub fn status(&self) -> SynthesisStatus {
        match self {
            SynthesisOutcome::Completed(_) => SynthesisStatus::Completed,
            SynthesisOutcome::Degraded { .. } => SynthesisStatus::Degraded,
        }
    }
}

/// Synthesis state reported in response metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStatus {
    /// Single-shot answer, no synthesis ran
    NotApplicable,
    Completed,
    Degraded,
}

/// Synthesizer for generating final answers from reasoning steps
pub struct ResponseSynthesizer {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ResponseSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>, config: &ReasoningConfig) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: config.synthesis_temperature,
            max_tokens: config.synthesis_max_tokens,
        }
    }

    /// Build the synthesis prompt; error steps are included like any other
    pub fn build_prompt(&self, query: &str, steps: &[ReasoningStep]) -> String {
        let mut prompt = format!(
            "\nBased on the step-by-step reasoning below, provide a comprehensive final answer to the original query.\n\n\
             Original Query: {}\n\n\
             Reasoning Steps:\n",
            query
        );

        for step in steps {
            let _ = write!(
                prompt,
                "\nStep {} ({}): {}\nAnalysis: {}\nSources: {}\n---\n",
                step.step_number,
                step.action,
                step.description,
                step.content,
                step.sources_used.join(", "),
            );
        }

        prompt.push_str(SYNTHESIS_INSTRUCTIONS);
        prompt
    }

    /// Synthesize the final answer
    pub async fn synthesize(&self, query: &str, steps: &[ReasoningStep]) -> SynthesisOutcome {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYNTHESIS_SYSTEM_PROMPT),
                ChatMessage::user(self.build_prompt(query, steps)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let start = Instant::now();
        let result = self.llm.complete(&request).await;
        crate::metrics::record_llm_call("synthesis", start.elapsed().as_secs_f64(), result.is_ok());

        match result {
            Ok(answer) => SynthesisOutcome::Completed(answer),
            Err(e) => {
                tracing::warn!(error = %e, step_count = steps.len(), "Synthesis failed, returning degraded answer");
                crate::metrics::record_synthesis_degraded();
                SynthesisOutcome::Degraded {
                    answer: format!("Error synthesizing response: {}", e),
                    error: e.to_string(),
                }
            }
        }
    }
}
