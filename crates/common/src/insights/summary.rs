use super::{transcript, InsightOutcome};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::models::Message;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a professional research summarizer. Create clear, structured summaries.";

/// Summary layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    Bullet,
    Executive,
    Academic,
}

impl SummaryFormat {
    pub const ALL: [SummaryFormat; 3] =
        [SummaryFormat::Bullet, SummaryFormat::Executive, SummaryFormat::Academic];

    pub fn id(&self) -> &'static str {
        match self {
            SummaryFormat::Bullet => "bullet",
            SummaryFormat::Executive => "executive",
            SummaryFormat::Academic => "academic",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SummaryFormat::Bullet => "Bullet Points",
            SummaryFormat::Executive => "Executive Summary",
            SummaryFormat::Academic => "Academic Format",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SummaryFormat::Bullet => "Structured bullet-point summary",
            SummaryFormat::Executive => "Professional executive summary",
            SummaryFormat::Academic => "Academic-style structured summary",
        }
    }

    fn prompt(&self, content: &str) -> String {
        match self {
            SummaryFormat::Bullet => format!(
                "\nBased on the research conversation below, create a structured bullet-point summary:\n\n\
                 {}\n\n\
                 Format your response as:\n\
                 # Research Summary\n\n\
                 ## Key Findings\n\
                 • [Finding 1]\n• [Finding 2]\n• [Finding 3]\n\n\
                 ## Main Topics Discussed\n\
                 • [Topic 1]: [Brief description]\n• [Topic 2]: [Brief description]\n\n\
                 ## Sources Referenced\n\
                 • [Source 1]\n• [Source 2]\n\n\
                 ## Action Items/Next Steps\n\
                 • [Item 1]\n• [Item 2]\n",
                content
            ),
            SummaryFormat::Executive => format!(
                "\nBased on the research conversation below, create an executive summary:\n\n\
                 {}\n\n\
                 Format your response as a professional executive summary with:\n\
                 1. Brief overview paragraph\n\
                 2. Key insights and findings\n\
                 3. Implications and recommendations\n\
                 4. Supporting evidence summary\n\n\
                 Keep it concise but comprehensive (300-500 words).\n",
                content
            ),
            SummaryFormat::Academic => format!(
                "\nBased on the research conversation below, create an academic-style summary:\n\n\
                 {}\n\n\
                 Format your response with:\n\
                 # Abstract\n[Brief abstract of the research discussion]\n\n\
                 # Introduction\n[Context and background]\n\n\
                 # Key Findings\n[Detailed findings with evidence]\n\n\
                 # Discussion\n[Analysis and implications]\n\n\
                 # Conclusion\n[Summary and future directions]\n\n\
                 # References\n[Sources mentioned in the conversation]\n\n\
                 Use formal academic language and structure.\n",
                content
            ),
        }
    }
}

/// Generates conversation summaries
pub struct SummaryGenerator {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl SummaryGenerator {
    const TEMPERATURE: f32 = 0.3;
    const MAX_TOKENS: u32 = 1000;

    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    /// Summarize the whole conversation in `format`
    pub async fn generate(&self, format: SummaryFormat, messages: &[Message]) -> InsightOutcome<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                ChatMessage::user(format.prompt(&transcript(messages, true))),
            ],
            temperature: Self::TEMPERATURE,
            max_tokens: Self::MAX_TOKENS,
        };

        let start = Instant::now();
        let result = self.llm.complete(&request).await;
        crate::metrics::record_llm_call("summary", start.elapsed().as_secs_f64(), result.is_ok());

        match result {
            Ok(summary) => InsightOutcome::Completed(summary),
            Err(e) => {
                tracing::warn!(format = format.id(), error = %e, "Summary generation failed");
                InsightOutcome::Degraded {
                    fallback: format!("Error generating summary: {}", e),
                    error: e.to_string(),
                }
            }
        }
    }
}
