//! LLM completion provider abstraction
//!
//! Provides a unified interface for chat-completion backends:
//! - Groq and OpenAI (OpenAI-compatible `/chat/completions`)
//! - Mock provider for local development
//! - Scripted provider for deterministic tests

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::models::{Message, Role};
use crate::resilience::{call_with_retry, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Trait for chat completion
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for the given conversation
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Role of a chat message sent to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Role-tagged message in a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::User => ChatRole::User,
            Role::Assistant => ChatRole::Assistant,
        };
        Self { role, content: message.content.clone() }
    }
}

/// A single completion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Text of the last user message, if any
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Client for OpenAI-compatible chat completion APIs (Groq, OpenAI)
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    policy: RetryPolicy,
}

impl OpenAICompatibleClient {
    /// Create a new client
    pub fn new(
        provider: &str,
        api_key: String,
        base_url: String,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self> {
        // Per-attempt timeouts are enforced by the retry policy
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::new(provider, timeout_secs, max_retries),
        })
    }

    async fn make_request(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus {
                provider: self.policy.provider.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response.json().await
            .map_err(|e| AppError::ProviderFailure {
                provider: self.policy.provider.clone(),
                message: format!("Failed to parse completion response: {}", e),
            })?;

        chat_response.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::ProviderFailure {
                provider: self.policy.provider.clone(),
                message: "Empty response from LLM".to_string(),
            })
    }
}

#[async_trait]
impl LlmProvider for OpenAICompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let start = std::time::Instant::now();
        let result = call_with_retry(&self.policy, || self.make_request(request)).await;

        tracing::debug!(
            provider = %self.policy.provider,
            model = %request.model,
            latency_ms = start.elapsed().as_millis() as u64,
            success = result.is_ok(),
            "Completion finished"
        );

        result
    }

    fn name(&self) -> &str {
        &self.policy.provider
    }
}

/// Mock provider for development without credentials
pub struct MockLlm;

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let topic = request
            .last_user_content()
            .and_then(|c| c.lines().find(|l| !l.trim().is_empty()))
            .unwrap_or("your question")
            .trim();

        Ok(format!(
            "Here is a considered answer regarding: {}\n\n[Mock response - LLM API key not configured]",
            topic
        ))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Provider that replays queued replies and records every request
///
/// Once the queue is exhausted every call returns `"Scripted response {n}"`.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.lock_replies().push_back(Ok(content.into()));
        self
    }

    /// Queue a provider failure
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.lock_replies().push_back(Err(message.into()));
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<String, String>>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let n = {
            let mut requests = self.requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            requests.push(request.clone());
            requests.len()
        };

        match self.lock_replies().pop_front() {
            Some(Ok(content)) => Ok(content),
            Some(Err(message)) => Err(AppError::ProviderFailure {
                provider: "scripted".to_string(),
                message,
            }),
            None => Ok(format!("Scripted response {}", n)),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Create a completion provider based on configuration
///
/// A missing credential for a hosted provider is fatal: the service cannot answer without it.
pub fn create_llm(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let default_base = match config.provider.as_str() {
        "groq" => GROQ_BASE_URL,
        "openai" => OPENAI_BASE_URL,
        "mock" => {
            tracing::warn!("Using mock LLM provider");
            return Ok(Arc::new(MockLlm));
        }
        other => {
            return Err(AppError::Configuration {
                message: format!("Unknown LLM provider '{}'", other),
            })
        }
    };

    let api_key = config.api_key.clone().ok_or_else(|| AppError::ProviderUnavailable {
        provider: config.provider.clone(),
        message: "API key not configured (set GROQ_API_KEY or APP__LLM__API_KEY)".to_string(),
    })?;

    let base_url = config.api_base.clone().unwrap_or_else(|| default_base.to_string());
    let client = OpenAICompatibleClient::new(
        &config.provider,
        api_key,
        base_url,
        config.timeout_secs,
        config.max_retries,
    )?;

    Ok(Arc::new(client))
}
