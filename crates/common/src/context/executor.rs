//! Step Executor - Runs one plan step against the LLM
//!
//! Provides:
//! - Step prompt construction with document excerpt and search results
//! - Heuristic provenance tagging of step output
//! - Fault isolation: a failed call yields an error step, never an `Err`

use crate::config::ReasoningConfig;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::models::{PlanStep, ReasoningStep, SearchResult, ERROR_SOURCE};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

const STEP_SYSTEM_PROMPT: &str =
    "You are an expert research assistant performing step-by-step reasoning.";

pub const DOCUMENT_SOURCE: &str = "Document content";
pub const WEB_SOURCE: &str = "Web search results";
pub const KNOWLEDGE_SOURCE: &str = "Knowledge base";

const DOCUMENT_TOKENS: &[&str] = &["document", "text", "content"];
const WEB_TOKENS: &[&str] = &["search", "web", "recent"];

/// Retrieved material available to every step of one request
#[derive(Debug, Clone, Copy, Default)]
pub struct StepInputs<'a> {
    pub query: &'a str,
    pub document: Option<&'a str>,
    pub search_results: &'a [SearchResult],
}

/// Executes reasoning steps
pub struct StepExecutor {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    excerpt_chars: usize,
    max_results: usize,
}

impl StepExecutor {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>, config: &ReasoningConfig) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: config.step_temperature,
            max_tokens: config.step_max_tokens,
            excerpt_chars: config.excerpt_chars,
            max_results: config.step_search_results,
        }
    }

    /// Build the user prompt for a step
    ///
    /// `prior_steps` is only non-empty in chained mode.
    pub fn build_prompt(
        &self,
        step: &PlanStep,
        inputs: &StepInputs<'_>,
        prior_steps: &[ReasoningStep],
    ) -> String {
        let mut prompt = format!(
            "\nYou are working on step {} of a multi-step reasoning process.\n\n\
             Original Query: {}\n\
             Current Step: {}\n\
             Action: {}\n\n\
             Instructions for this step:\n{}",
            step.step_number,
            inputs.query,
            step.description,
            step.action,
            step.action.guidance(),
        );

        if let Some(document) = inputs.document.filter(|d| !d.is_empty()) {
            let excerpt: String = document.chars().take(self.excerpt_chars).collect();
            let _ = write!(prompt, "\n\nDocument Content Available:\n{}...", excerpt);
        }

        if !inputs.search_results.is_empty() {
            prompt.push_str("\n\nWeb Search Results Available:\n");
            for (i, result) in inputs.search_results.iter().take(self.max_results).enumerate() {
                let _ = writeln!(prompt, "{}. {}: {}", i + 1, result.title, result.description);
            }
        }

        if !prior_steps.is_empty() {
            prompt.push_str("\n\nFindings from previous steps:\n");
            for prior in prior_steps {
                let _ = writeln!(
                    prompt,
                    "Step {} ({}): {}",
                    prior.step_number, prior.action, prior.content
                );
            }
        }

        prompt.push_str("\n\nProvide your analysis for this step only. Be specific and detailed.");
        prompt
    }

    /// Execute one step
    ///
    /// Provider failures become a step whose content describes the error and
    /// whose only source is `"Error"`.
    pub async fn execute(
        &self,
        step: &PlanStep,
        inputs: &StepInputs<'_>,
        prior_steps: &[ReasoningStep],
    ) -> ReasoningStep {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(STEP_SYSTEM_PROMPT),
                ChatMessage::user(self.build_prompt(step, inputs, prior_steps)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let start = Instant::now();
        let result = self.llm.complete(&request).await;
        crate::metrics::record_llm_call("step", start.elapsed().as_secs_f64(), result.is_ok());

        let (content, sources_used) = match result {
            Ok(content) => {
                let sources = tag_sources(&content, inputs);
                (content, sources)
            }
            Err(e) => {
                tracing::warn!(
                    step = step.step_number,
                    action = %step.action,
                    error = %e,
                    "Reasoning step failed, continuing"
                );
                crate::metrics::record_step_failure(step.action.as_str());
                (format!("Error in reasoning step: {}", e), vec![ERROR_SOURCE.to_string()])
            }
        };

        ReasoningStep {
            step_number: step.step_number,
            action: step.action,
            description: step.description.clone(),
            content,
            sources_used,
        }
    }

    /// Execute every step of a plan in order
    ///
    /// Steps are independent unless `chained` is set, in which case each
    /// prompt carries the output of all earlier steps.
    pub async fn execute_plan(
        &self,
        plan: &[PlanStep],
        inputs: &StepInputs<'_>,
        chained: bool,
    ) -> Vec<ReasoningStep> {
        let mut steps: Vec<ReasoningStep> = Vec::with_capacity(plan.len());

        for step in plan {
            let prior: &[ReasoningStep] = if chained { &steps } else { &[] };
            let executed = self.execute(step, inputs, prior).await;
            steps.push(executed);
        }

        steps
    }
}

/// Label the sources a step's output appears to draw on
///
/// A category is only considered when its material was supplied.
fn tag_sources(content: &str, inputs: &StepInputs<'_>) -> Vec<String> {
    let lower = content.to_lowercase();
    let mentions = |tokens: &[&str]| tokens.iter().any(|t| lower.contains(t));

    let mut sources = Vec::new();
    if inputs.document.is_some_and(|d| !d.is_empty()) && mentions(DOCUMENT_TOKENS) {
        sources.push(DOCUMENT_SOURCE.to_string());
    }
    if !inputs.search_results.is_empty() && mentions(WEB_TOKENS) {
        sources.push(WEB_SOURCE.to_string());
    }
    if sources.is_empty() {
        sources.push(KNOWLEDGE_SOURCE.to_string());
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ReasoningPlanner;
    use crate::llm::ScriptedLlm;
    use crate::models::{QueryType, StepAction};

    fn executor(llm: Arc<ScriptedLlm>) -> StepExecutor {
        StepExecutor::new(llm, "test-model", &ReasoningConfig::default())
    }

    fn results() -> Vec<SearchResult> {
        (1..=5)
            .map(|i| SearchResult::new(format!("Title {}", i), format!("https://{}.example", i), format!("desc {}", i)))
            .collect()
    }

    #[test]
    fn test_prompt_contents() {
        let exec = executor(Arc::new(ScriptedLlm::new()));
        let document = "x".repeat(1500);
        let results = results();
        let inputs = StepInputs { query: "Why?", document: Some(&document), search_results: &results };
        let step = PlanStep::new(2, StepAction::Compare, "Compare and contrast the subjects");

        let prompt = exec.build_prompt(&step, &inputs, &[]);

        assert!(prompt.contains("step 2 of a multi-step"));
        assert!(prompt.contains("Action: compare"));
        assert!(prompt.contains(StepAction::Compare.guidance()));
        assert!(prompt.contains(&format!("{}...", "x".repeat(1000))));
        assert!(!prompt.contains(&"x".repeat(1001)));
        assert!(prompt.contains("3. Title 3: desc 3"));
        assert!(!prompt.contains("Title 4"));
        assert!(!prompt.contains("previous steps"));
    }

    #[tokio::test]
    async fn test_failed_step_is_contained() {
        let llm = Arc::new(ScriptedLlm::new().reply("first").fail("rate limited").reply("third"));
        let exec = executor(llm.clone());
        let plan = ReasoningPlanner::new().plan(QueryType::General, 3);
        let inputs = StepInputs { query: "q", ..Default::default() };

        let steps = exec.execute_plan(&plan, &inputs, false).await;

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].sources_used, vec!["Error".to_string()]);
        assert!(steps[1].content.starts_with("Error in reasoning step:"));
        assert!(steps[1].is_error());
        assert_eq!(steps[2].content, "third");
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_request_parameters() {
        let llm = Arc::new(ScriptedLlm::new());
        let exec = executor(llm.clone());
        let step = PlanStep::new(1, StepAction::Understand, "Understand the question");

        exec.execute(&step, &StepInputs { query: "q", ..Default::default() }, &[]).await;

        let request = &llm.requests()[0];
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.messages[0].content, STEP_SYSTEM_PROMPT);
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_chained_mode_forwards_prior_output() {
        let llm = Arc::new(ScriptedLlm::new().reply("ALPHA").reply("BETA").reply("GAMMA"));
        let exec = executor(llm.clone());
        let plan = ReasoningPlanner::new().plan(QueryType::Analysis, 3);
        let inputs = StepInputs { query: "q", ..Default::default() };

        exec.execute_plan(&plan, &inputs, true).await;

        let requests = llm.requests();
        let third = requests[2].last_user_content().unwrap();
        assert!(third.contains("Step 1 (break_down): ALPHA"));
        assert!(third.contains("Step 2 (examine): BETA"));
    }

    #[tokio::test]
    async fn test_independent_mode_does_not_forward() {
        let llm = Arc::new(ScriptedLlm::new().reply("ALPHA"));
        let exec = executor(llm.clone());
        let plan = ReasoningPlanner::new().plan(QueryType::Analysis, 2);

        exec.execute_plan(&plan, &StepInputs { query: "q", ..Default::default() }, false).await;

        assert!(!llm.requests()[1].last_user_content().unwrap().contains("ALPHA"));
    }

    #[test]
    fn test_provenance_tags() {
        let results = results();
        let with_both = StepInputs { query: "q", document: Some("doc"), search_results: &results };
        let bare = StepInputs { query: "q", ..Default::default() };

        assert_eq!(
            tag_sources("The document and recent web coverage agree", &with_both),
            vec![DOCUMENT_SOURCE.to_string(), WEB_SOURCE.to_string()]
        );
        // Tokens only count when the material was supplied
        assert_eq!(
            tag_sources("The document says so", &bare),
            vec![KNOWLEDGE_SOURCE.to_string()]
        );
    }
}
