//! Research Orchestrator - Turns a chat request into an answer
//!
//! Provides:
//! - Single-shot answers grounded in documents and web results
//! - Plan, execute and synthesize reasoning answers
//! - Per-conversation serialization of turns
//! - Batch processing

use super::attribution::{LexicalAttributor, SourceAttributor};
use super::classifier::QueryClassifier;
use super::executor::{StepExecutor, StepInputs};
use super::planner::ReasoningPlanner;
use super::synthesizer::{ResponseSynthesizer, SynthesisStatus};
use super::window::ConversationContextWindow;
use crate::config::{AppConfig, ReasoningConfig};
use crate::errors::{AppError, Result};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::models::{Message, QueryType, ReasoningStep, SearchResult};
use crate::search::{SearchOutcome, SearchService};
use crate::store::{ConversationRepository, DocumentRepository, KeyedLocks};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use validator::Validate;

const ASSISTANT_PERSONA: &str = "You are SynthesisTalk, an intelligent research assistant. \
You help users explore complex topics through conversation. Maintain context from previous \
messages and provide thoughtful, well-reasoned responses.";

const ATTRIBUTION_INSTRUCTIONS: &str = "

IMPORTANT: When referencing information, clearly indicate your sources:
- For document content, use: [Document: filename]
- For web search results, use: [Web: source title]
- For your training knowledge, use: [Knowledge Base]
";

/// Label used when the caller passes document text directly
pub const INLINE_DOCUMENT_LABEL: &str = "Document content integrated";

/// One chat turn
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResearchRequest {
    #[validate(length(min = 1))]
    pub prompt: String,

    #[serde(default = "default_conversation_id")]
    #[validate(length(min = 1, max = 256))]
    pub conversation_id: String,

    /// Replaces the stored context window when non-empty
    #[serde(default)]
    pub context: Vec<Message>,

    #[serde(default)]
    pub include_search: bool,

    /// Raw document text to ground the answer in
    #[serde(default)]
    pub document_context: Option<String>,

    /// Stored document to ground the answer in; ignored when `document_context` is set
    #[serde(default)]
    pub document_id: Option<String>,

    #[serde(default = "default_true")]
    pub enable_source_attribution: bool,

    #[serde(default)]
    pub enable_chain_of_thought: bool,

    #[serde(default = "default_reasoning_depth")]
    #[validate(range(min = 1, max = 10))]
    pub reasoning_depth: usize,

    /// Feed earlier step output into later step prompts
    #[serde(default)]
    pub chain_steps: bool,
}

fn default_conversation_id() -> String { "default".to_string() }
fn default_true() -> bool { true }
fn default_reasoning_depth() -> usize { 3 }

impl ResearchRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            conversation_id: default_conversation_id(),
            context: Vec::new(),
            include_search: false,
            document_context: None,
            document_id: None,
            enable_source_attribution: true,
            enable_chain_of_thought: false,
            reasoning_depth: default_reasoning_depth(),
            chain_steps: false,
        }
    }
}

/// What happened to the web search of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    NotRequested,
    /// Requested but no search provider is configured
    Disabled,
    Fresh,
    Cached,
    /// Provider failed; the turn continued without results
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model_used: String,
    pub temperature: f32,
    pub source_attribution_enabled: bool,
    pub chain_of_thought_enabled: bool,
    pub reasoning_enabled: bool,
    pub reasoning_steps_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_cached: Option<bool>,
    pub search_status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_error: Option<String>,
    pub synthesis_status: SynthesisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
}

/// Answer to one chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub response: String,
    pub conversation_id: String,
    /// Full conversation after this turn
    pub updated_context: Vec<Message>,
    pub search_results: Option<Vec<SearchResult>>,
    pub document_used: Option<String>,
    pub sources_used: Vec<String>,
    pub response_metadata: ResponseMetadata,
    pub reasoning_steps: Vec<ReasoningStep>,
}

/// Per-item result of a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub conversation_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResearchResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct ResolvedDocument {
    text: String,
    label: String,
}

struct GatheredSearch {
    outcome: Option<SearchOutcome>,
    status: SearchStatus,
    error: Option<String>,
}

struct Answer {
    text: String,
    steps: Vec<ReasoningStep>,
    synthesis_status: SynthesisStatus,
    query_type: Option<QueryType>,
    temperature: f32,
}

/// Facade over the reasoning pipeline, providers and stores
pub struct ResearchAssistant {
    llm: Arc<dyn LlmProvider>,
    search: SearchService,
    conversations: Arc<dyn ConversationRepository>,
    documents: Arc<dyn DocumentRepository>,
    window: ConversationContextWindow,
    classifier: QueryClassifier,
    planner: ReasoningPlanner,
    executor: StepExecutor,
    synthesizer: ResponseSynthesizer,
    attributor: Arc<dyn SourceAttributor>,
    locks: KeyedLocks,
    config: ReasoningConfig,
    model: String,
    max_batch_requests: usize,
}

impl ResearchAssistant {
    pub fn new(
        config: &AppConfig,
        llm: Arc<dyn LlmProvider>,
        search: SearchService,
        conversations: Arc<dyn ConversationRepository>,
        documents: Arc<dyn DocumentRepository>,
    ) -> Self {
        let model = config.llm.model.clone();
        Self {
            executor: StepExecutor::new(llm.clone(), model.clone(), &config.reasoning),
            synthesizer: ResponseSynthesizer::new(llm.clone(), model.clone(), &config.reasoning),
            window: ConversationContextWindow::new(
                conversations.clone(),
                config.conversation.context_window,
            ),
            llm,
            search,
            conversations,
            documents,
            classifier: QueryClassifier::new(),
            planner: ReasoningPlanner::new(),
            attributor: Arc::new(LexicalAttributor),
            locks: KeyedLocks::new(),
            config: config.reasoning.clone(),
            model,
            max_batch_requests: config.conversation.max_batch_requests,
        }
    }

    /// Replace the default lexical attributor
    pub fn with_attributor(mut self, attributor: Arc<dyn SourceAttributor>) -> Self {
        self.attributor = attributor;
        self
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub fn search(&self) -> &SearchService {
        &self.search
    }

    pub fn conversations(&self) -> &Arc<dyn ConversationRepository> {
        &self.conversations
    }

    pub fn documents(&self) -> &Arc<dyn DocumentRepository> {
        &self.documents
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer one chat turn and record it in the conversation
    ///
    /// Turns on the same conversation run one at a time. Step and synthesis
    /// failures degrade the answer; a failed single-shot call is returned as
    /// an error and nothing is recorded.
    #[instrument(skip(self, request), fields(conversation_id = %request.conversation_id))]
    pub async fn respond(&self, request: ResearchRequest) -> Result<ResearchResponse> {
        request.validate()?;
        if request.reasoning_depth > self.config.max_depth {
            return Err(AppError::Validation {
                message: format!("reasoning_depth must be at most {}", self.config.max_depth),
                field: Some("reasoning_depth".to_string()),
            });
        }

        let start = Instant::now();
        let conversation_id = request.conversation_id.clone();
        let _turn = self.locks.lock(&conversation_id).await;

        self.conversations.create(&conversation_id, None).await?;
        let context = self.window.resolve(&conversation_id, &request.context).await?;
        let document = self.resolve_document(&request).await?;
        let search = self.gather_search(&request).await;

        let search_results: &[SearchResult] = search
            .outcome
            .as_ref()
            .map(|o| o.results.as_slice())
            .unwrap_or(&[]);

        let answer = if request.enable_chain_of_thought {
            self.reason(&request, document.as_ref(), search_results).await
        } else {
            self.single_shot(&request, &context, document.as_ref(), search.outcome.as_ref())
                .await?
        };

        // Reasoning answers feed the document to the steps but do not report it
        let document_label = if request.enable_chain_of_thought {
            None
        } else {
            document.as_ref().map(|d| d.label.clone())
        };

        let sources_used = if request.enable_source_attribution {
            self.attributor
                .attribute(&answer.text, search_results, document_label.as_deref())
        } else {
            Vec::new()
        };

        self.conversations
            .append(&conversation_id, Message::user(request.prompt.clone()))
            .await?;
        self.conversations
            .append(
                &conversation_id,
                Message::assistant(answer.text.clone(), sources_used.clone(), answer.steps.clone()),
            )
            .await?;
        let updated_context = self.conversations.messages(&conversation_id).await?;

        info!(
            chain_of_thought = request.enable_chain_of_thought,
            steps = answer.steps.len(),
            search_status = ?search.status,
            synthesis_status = ?answer.synthesis_status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Chat turn completed"
        );

        let response_metadata = ResponseMetadata {
            model_used: self.model.clone(),
            temperature: answer.temperature,
            source_attribution_enabled: request.enable_source_attribution,
            chain_of_thought_enabled: request.enable_chain_of_thought,
            reasoning_enabled: request.enable_chain_of_thought,
            reasoning_steps_count: answer.steps.len(),
            search_cached: search.outcome.as_ref().map(|o| o.cached),
            search_status: search.status,
            search_error: search.error,
            synthesis_status: answer.synthesis_status,
            query_type: answer.query_type,
        };

        Ok(ResearchResponse {
            response: answer.text,
            conversation_id,
            updated_context,
            search_results: search.outcome.map(|o| o.results),
            document_used: document_label,
            sources_used,
            response_metadata,
            reasoning_steps: answer.steps,
        })
    }

    /// Process up to `max_batch_requests` turns; each item succeeds or fails alone
    pub async fn respond_batch(&self, requests: Vec<ResearchRequest>) -> Result<Vec<BatchItemResult>> {
        if requests.len() > self.max_batch_requests {
            return Err(AppError::Validation {
                message: format!("Maximum {} requests per batch", self.max_batch_requests),
                field: Some("requests".to_string()),
            });
        }

        let turns = requests.into_iter().enumerate().map(|(index, request)| async move {
            let conversation_id = request.conversation_id.clone();
            match self.respond(request).await {
                Ok(response) => BatchItemResult {
                    index,
                    conversation_id,
                    success: true,
                    response: Some(response),
                    error: None,
                },
                Err(e) => BatchItemResult {
                    index,
                    conversation_id,
                    success: false,
                    response: None,
                    error: Some(e.to_string()),
                },
            }
        });

        Ok(futures::future::join_all(turns).await)
    }

    async fn resolve_document(&self, request: &ResearchRequest) -> Result<Option<ResolvedDocument>> {
        if let Some(text) = request.document_context.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Some(ResolvedDocument {
                text: text.clone(),
                label: INLINE_DOCUMENT_LABEL.to_string(),
            }));
        }

        let Some(id) = request.document_id.as_ref() else {
            return Ok(None);
        };

        let document = self
            .documents
            .get(id)
            .await?
            .ok_or_else(|| AppError::DocumentNotFound { id: id.clone() })?;

        Ok(Some(ResolvedDocument {
            text: document.content.clone(),
            label: document.filename.clone(),
        }))
    }

    async fn gather_search(&self, request: &ResearchRequest) -> GatheredSearch {
        if !request.include_search {
            return GatheredSearch { outcome: None, status: SearchStatus::NotRequested, error: None };
        }
        if !self.search.is_enabled() {
            return GatheredSearch { outcome: None, status: SearchStatus::Disabled, error: None };
        }

        match self.search.search(&request.prompt, self.config.search_results_limit).await {
            Ok(outcome) => {
                let status = if outcome.cached { SearchStatus::Cached } else { SearchStatus::Fresh };
                GatheredSearch { outcome: Some(outcome), status, error: None }
            }
            Err(e) => {
                warn!(error = %e, "Web search failed, answering without results");
                GatheredSearch { outcome: None, status: SearchStatus::Failed, error: Some(e.to_string()) }
            }
        }
    }

    async fn reason(
        &self,
        request: &ResearchRequest,
        document: Option<&ResolvedDocument>,
        search_results: &[SearchResult],
    ) -> Answer {
        let query_type = self.classifier.classify(&request.prompt);
        let plan = self.planner.plan(query_type, request.reasoning_depth);
        let inputs = StepInputs {
            query: &request.prompt,
            document: document.map(|d| d.text.as_str()),
            search_results,
        };

        let steps = self.executor.execute_plan(&plan, &inputs, request.chain_steps).await;
        let outcome = self.synthesizer.synthesize(&request.prompt, &steps).await;

        Answer {
            synthesis_status: outcome.status(),
            text: outcome.into_answer(),
            steps,
            query_type: Some(query_type),
            temperature: self.config.step_temperature,
        }
    }

    async fn single_shot(
        &self,
        request: &ResearchRequest,
        context: &[Message],
        document: Option<&ResolvedDocument>,
        search: Option<&SearchOutcome>,
    ) -> Result<Answer> {
        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(ChatMessage::system(system_prompt(
            request.enable_source_attribution,
            document,
            search,
        )));
        messages.extend(context.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(request.prompt.clone()));

        let completion = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.config.chat_temperature,
            max_tokens: self.config.chat_max_tokens,
        };

        let start = Instant::now();
        let result = self.llm.complete(&completion).await;
        crate::metrics::record_llm_call("chat", start.elapsed().as_secs_f64(), result.is_ok());

        Ok(Answer {
            text: result?,
            steps: Vec::new(),
            synthesis_status: SynthesisStatus::NotApplicable,
            query_type: None,
            temperature: self.config.chat_temperature,
        })
    }
}

fn system_prompt(
    attribution: bool,
    document: Option<&ResolvedDocument>,
    search: Option<&SearchOutcome>,
) -> String {
    let mut prompt = ASSISTANT_PERSONA.to_string();

    if attribution {
        prompt.push_str(ATTRIBUTION_INSTRUCTIONS);
    }

    if let Some(document) = document {
        let _ = write!(
            prompt,
            "\n\nYou have access to the following document content for reference:\n\n\
             --- DOCUMENT CONTENT ---\n{}\n--- END DOCUMENT ---\n\n\
             Use this document content to provide more informed responses when relevant.",
            document.text
        );
    }

    if let Some(search) = search.filter(|s| !s.results.is_empty()) {
        let _ = writeln!(prompt, "\n\nWeb search results for your reference (Cached: {}):", search.cached);
        for (i, result) in search.results.iter().enumerate() {
            let _ = write!(
                prompt,
                "{}. {}\n   {}\n   Source: {}\n\n",
                i + 1,
                result.title,
                result.description,
                result.url
            );
        }
        prompt.push_str(
            "Use these search results to provide more current and comprehensive information when relevant.",
        );
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SearchCache;
    use crate::llm::{ChatRole, ScriptedLlm};
    use crate::models::{Role, StoredDocument};
    use crate::search::{StaticSearch, WebSearchProvider};
    use crate::store::{InMemoryConversationRepository, InMemoryDocumentRepository};
    use std::time::Duration;

    fn assistant(llm: Arc<ScriptedLlm>, search: Option<Arc<StaticSearch>>) -> ResearchAssistant {
        let provider = search.map(|s| s as Arc<dyn WebSearchProvider>);
        let service = SearchService::new(provider, Arc::new(SearchCache::new(Duration::from_secs(86_400))));
        ResearchAssistant::new(
            &AppConfig::default(),
            llm,
            service,
            Arc::new(InMemoryConversationRepository::new()),
            Arc::new(InMemoryDocumentRepository::new()),
        )
    }

    fn results() -> Vec<SearchResult> {
        vec![
            SearchResult::new("Solar photovoltaics overview", "https://solar.example", "Panels"),
            SearchResult::new("Coal plants", "https://coal.example", "Emissions"),
        ]
    }

    fn request(prompt: &str, conversation_id: &str) -> ResearchRequest {
        ResearchRequest { conversation_id: conversation_id.to_string(), ..ResearchRequest::new(prompt) }
    }

    #[tokio::test]
    async fn test_single_shot_turn_is_recorded() {
        let llm = Arc::new(ScriptedLlm::new().reply("Tides come from the moon."));
        let ra = assistant(llm.clone(), None);

        let response = ra.respond(request("What causes tides?", "c1")).await.unwrap();

        assert_eq!(response.response, "Tides come from the moon.");
        assert_eq!(response.sources_used, vec!["LLM Knowledge Base".to_string()]);
        assert_eq!(response.updated_context.len(), 2);
        assert_eq!(response.updated_context[0].role, Role::User);
        assert!(response.reasoning_steps.is_empty());
        assert!(response.search_results.is_none());

        let meta = &response.response_metadata;
        assert_eq!(meta.temperature, 0.7);
        assert_eq!(meta.synthesis_status, SynthesisStatus::NotApplicable);
        assert_eq!(meta.search_status, SearchStatus::NotRequested);
        assert_eq!(meta.model_used, "llama3-8b-8192");

        let sent = &llm.requests()[0];
        assert_eq!(sent.temperature, 0.7);
        assert_eq!(sent.max_tokens, 1000);
        assert!(sent.messages[0].content.contains("[Knowledge Base]"));
    }

    #[tokio::test]
    async fn test_reasoning_survives_a_failed_step() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .reply("subjects: solar, coal")
                .fail("provider hiccup")
                .reply("they differ")
                .reply("Final comparison"),
        );
        let ra = assistant(llm.clone(), None);
        let mut req = request("Compare renewable energy and fossil fuels", "c1");
        req.enable_chain_of_thought = true;

        let response = ra.respond(req).await.unwrap();

        assert_eq!(response.response, "Final comparison");
        assert_eq!(response.reasoning_steps.len(), 3);
        assert!(response.reasoning_steps[1].is_error());
        assert_eq!(response.response_metadata.reasoning_steps_count, 3);
        assert_eq!(response.response_metadata.temperature, 0.3);
        assert_eq!(response.response_metadata.query_type, Some(QueryType::Comparison));
        assert_eq!(response.response_metadata.synthesis_status, SynthesisStatus::Completed);
        assert_eq!(llm.call_count(), 4);

        let stored = response.updated_context[1].reasoning_steps.as_ref().unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_degraded_synthesis_is_typed() {
        let llm = Arc::new(ScriptedLlm::new().reply("a").reply("b").reply("c").fail("down"));
        let ra = assistant(llm, None);
        let mut req = request("Explain why", "c1");
        req.enable_chain_of_thought = true;

        let response = ra.respond(req).await.unwrap();

        assert_eq!(response.response_metadata.synthesis_status, SynthesisStatus::Degraded);
        assert!(response.response.starts_with("Error synthesizing response:"));
    }

    #[tokio::test]
    async fn test_repeated_search_is_served_from_cache() {
        let llm = Arc::new(ScriptedLlm::new());
        let search = Arc::new(StaticSearch::new(results()));
        let ra = assistant(llm.clone(), Some(search.clone()));

        let mut first = request("solar vs coal", "c1");
        first.include_search = true;
        let mut second = first.clone();
        second.conversation_id = "c2".to_string();

        let a = ra.respond(first).await.unwrap();
        let b = ra.respond(second).await.unwrap();

        assert_eq!(a.response_metadata.search_status, SearchStatus::Fresh);
        assert_eq!(a.response_metadata.search_cached, Some(false));
        assert_eq!(b.response_metadata.search_status, SearchStatus::Cached);
        assert_eq!(b.search_results, a.search_results);
        assert_eq!(search.call_count(), 1);

        let system = &llm.requests()[1].messages[0].content;
        assert!(system.contains("(Cached: true)"));
        assert!(system.contains("1. Solar photovoltaics overview\n   Panels\n   Source: https://solar.example"));
    }

    #[tokio::test]
    async fn test_search_problems_degrade() {
        let llm = Arc::new(ScriptedLlm::new());
        let mut req = request("latest news", "c1");
        req.include_search = true;

        let disabled = assistant(llm.clone(), None).respond(req.clone()).await.unwrap();
        assert_eq!(disabled.response_metadata.search_status, SearchStatus::Disabled);

        let failing = assistant(llm, Some(Arc::new(StaticSearch::failing())));
        let response = failing.respond(req).await.unwrap();
        assert_eq!(response.response_metadata.search_status, SearchStatus::Failed);
        assert!(response.response_metadata.search_error.is_some());
        assert!(response.search_results.is_none());
    }

    #[tokio::test]
    async fn test_context_window_and_override() {
        let llm = Arc::new(ScriptedLlm::new());
        let ra = assistant(llm.clone(), None);
        for i in 0..12 {
            ra.conversations().append("c1", Message::user(format!("old {}", i))).await.unwrap();
        }

        ra.respond(request("next", "c1")).await.unwrap();
        let windowed = &llm.requests()[0].messages;
        assert_eq!(windowed.len(), 12);
        assert_eq!(windowed[1].content, "old 2");

        let mut overridden = request("again", "c1");
        overridden.context = vec![Message::user("supplied")];
        ra.respond(overridden).await.unwrap();
        let sent = &llm.requests()[1].messages;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].content, "supplied");
        assert_eq!(sent[1].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_stored_document_grounds_the_answer() {
        let llm = Arc::new(ScriptedLlm::new());
        let ra = assistant(llm.clone(), None);
        ra.documents()
            .insert(StoredDocument {
                id: "abc123".into(),
                filename: "notes.txt".into(),
                content_type: "text/plain".into(),
                content: "Mitochondria produce ATP.".into(),
                content_length: 25,
                chunks: Vec::new(),
                uploaded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let mut req = request("Summarize my notes", "c1");
        req.document_id = Some("abc123".into());
        let response = ra.respond(req).await.unwrap();

        assert_eq!(response.document_used.as_deref(), Some("notes.txt"));
        assert_eq!(response.sources_used[0], "Document: notes.txt");
        assert!(llm.requests()[0].messages[0].content.contains("--- DOCUMENT CONTENT ---\nMitochondria produce ATP."));

        let mut missing = request("x", "c1");
        missing.document_id = Some("nope".into());
        assert!(matches!(ra.respond(missing).await, Err(AppError::DocumentNotFound { .. })));
    }

    #[tokio::test]
    async fn test_inline_document_label() {
        let ra = assistant(Arc::new(ScriptedLlm::new()), None);
        let mut req = request("q", "c1");
        req.document_context = Some("inline text".into());

        let response = ra.respond(req).await.unwrap();
        assert_eq!(response.document_used.as_deref(), Some(INLINE_DOCUMENT_LABEL));
    }

    #[tokio::test]
    async fn test_reasoning_uses_document_without_reporting_it() {
        let llm = Arc::new(ScriptedLlm::new());
        let ra = assistant(llm.clone(), None);
        let mut req = request("Explain the tides", "c1");
        req.enable_chain_of_thought = true;
        req.document_context = Some("tide notes".into());

        let response = ra.respond(req).await.unwrap();

        assert!(response.document_used.is_none());
        assert!(response.sources_used.iter().all(|s| !s.starts_with("Document:")));
        let first_step = llm.requests()[0].last_user_content().unwrap().to_string();
        assert!(first_step.contains("Document Content Available:\ntide notes..."));
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected() {
        let ra = assistant(Arc::new(ScriptedLlm::new()), None);

        let mut zero_depth = request("q", "c1");
        zero_depth.reasoning_depth = 0;
        assert!(matches!(ra.respond(zero_depth).await, Err(AppError::Validation { .. })));

        assert!(matches!(ra.respond(request("", "c1")).await, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_single_shot_failure_records_nothing() {
        let ra = assistant(Arc::new(ScriptedLlm::new().fail("boom")), None);

        let result = ra.respond(request("q", "c1")).await;

        assert!(matches!(result, Err(AppError::ProviderFailure { .. })));
        assert!(ra.conversations().messages("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_items_fail_independently() {
        let ra = assistant(Arc::new(ScriptedLlm::new()), None);

        let results = ra
            .respond_batch(vec![request("fine", "a"), request("", "b")])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].conversation_id, "b");
        assert!(results[1].error.is_some());

        let too_many = (0..11).map(|i| request("q", &format!("c{}", i))).collect();
        assert!(matches!(ra.respond_batch(too_many).await, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_conversation_interleave_cleanly() {
        let ra = assistant(Arc::new(ScriptedLlm::new()), None);

        let (a, b) = tokio::join!(
            ra.respond(request("first", "shared")),
            ra.respond(request("second", "shared"))
        );
        a.unwrap();
        b.unwrap();

        let roles: Vec<Role> = ra
            .conversations()
            .messages("shared")
            .await
            .unwrap()
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
    }
}
