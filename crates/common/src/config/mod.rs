//! Configuration management for SynthesisTalk services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Legacy provider credentials (GROQ_API_KEY, BRAVE_API_KEY)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM completion provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search provider configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Reasoning pipeline configuration
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Document ingestion configuration
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Search cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Conversation configuration
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider: groq, openai, mock
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key for the completion service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model identifier sent with every completion
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Retries on transient failure
    #[serde(default = "default_provider_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Brave Search subscription token; search is disabled when absent
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_search_base")]
    pub api_base: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Retries on transient failure
    #[serde(default = "default_provider_retries")]
    pub max_retries: u32,

    #[serde(default = "default_search_country")]
    pub country: String,

    #[serde(default = "default_search_language")]
    pub language: String,

    #[serde(default = "default_safesearch")]
    pub safesearch: String,

    /// Result freshness window (pd, pw, pm, py)
    #[serde(default = "default_freshness")]
    pub freshness: String,

    /// Default result count for the search endpoint
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReasoningConfig {
    /// Steps planned when the request does not say
    #[serde(default = "default_depth")]
    pub default_depth: usize,

    /// Upper bound on requested steps
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Search results fetched for a chat turn
    #[serde(default = "default_search_results_limit")]
    pub search_results_limit: usize,

    /// Search results shown to each step
    #[serde(default = "default_step_search_results")]
    pub step_search_results: usize,

    /// Document characters shown to each step
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    #[serde(default = "default_step_temperature")]
    pub step_temperature: f32,

    #[serde(default = "default_step_max_tokens")]
    pub step_max_tokens: u32,

    #[serde(default = "default_synthesis_temperature")]
    pub synthesis_temperature: f32,

    #[serde(default = "default_synthesis_max_tokens")]
    pub synthesis_max_tokens: u32,

    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,

    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentsConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Age after which a cached search result is treated as a miss
    #[serde(default = "default_cache_max_age")]
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationConfig {
    /// Prior messages fed into a model call
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Maximum requests accepted by the batch endpoint
    #[serde(default = "default_max_batch")]
    pub max_batch_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 120 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:3001".to_string(),
    ]
}
fn default_llm_provider() -> String { "groq".to_string() }
fn default_model() -> String { crate::DEFAULT_MODEL.to_string() }
fn default_provider_timeout() -> u64 { 30 }
fn default_provider_retries() -> u32 { 1 }
fn default_search_base() -> String { "https://api.search.brave.com/res/v1/web/search".to_string() }
fn default_search_country() -> String { "us".to_string() }
fn default_search_language() -> String { "en".to_string() }
fn default_safesearch() -> String { "moderate".to_string() }
fn default_freshness() -> String { "pm".to_string() }
fn default_max_results() -> usize { 5 }
fn default_depth() -> usize { 3 }
fn default_max_depth() -> usize { 10 }
fn default_search_results_limit() -> usize { 3 }
fn default_step_search_results() -> usize { 3 }
fn default_excerpt_chars() -> usize { 1000 }
fn default_step_temperature() -> f32 { 0.3 }
fn default_step_max_tokens() -> u32 { 500 }
fn default_synthesis_temperature() -> f32 { 0.5 }
fn default_synthesis_max_tokens() -> u32 { 800 }
fn default_chat_temperature() -> f32 { 0.7 }
fn default_chat_max_tokens() -> u32 { 1000 }
fn default_chunk_size() -> usize { 2000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }
fn default_cache_max_age() -> u64 { 24 * 60 * 60 }
fn default_context_window() -> usize { crate::DEFAULT_CONTEXT_WINDOW }
fn default_max_batch() -> usize { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "synthesis-talk".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_base: None,
            model: default_model(),
            timeout_secs: default_provider_timeout(),
            max_retries: default_provider_retries(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_search_base(),
            timeout_secs: default_provider_timeout(),
            max_retries: default_provider_retries(),
            country: default_search_country(),
            language: default_search_language(),
            safesearch: default_safesearch(),
            freshness: default_freshness(),
            default_max_results: default_max_results(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
            max_depth: default_max_depth(),
            search_results_limit: default_search_results_limit(),
            step_search_results: default_step_search_results(),
            excerpt_chars: default_excerpt_chars(),
            step_temperature: default_step_temperature(),
            step_max_tokens: default_step_max_tokens(),
            synthesis_temperature: default_synthesis_temperature(),
            synthesis_max_tokens: default_synthesis_max_tokens(),
            chat_temperature: default_chat_temperature(),
            chat_max_tokens: default_chat_max_tokens(),
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_cache_max_age(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            max_batch_requests: default_max_batch(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Fill provider credentials from the plain GROQ_API_KEY / BRAVE_API_KEY variables
    /// when the structured keys are not set.
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("GROQ_API_KEY").filter(|k| !k.trim().is_empty());
        }
        if self.search.api_key.is_none() {
            self.search.api_key = lookup("BRAVE_API_KEY").filter(|k| !k.trim().is_empty());
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get cache max age as Duration
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache.max_age_secs)
    }

    /// Whether web search can be enabled
    pub fn search_enabled(&self) -> bool {
        self.search.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            reasoning: ReasoningConfig::default(),
            documents: DocumentsConfig::default(),
            cache: CacheConfig::default(),
            conversation: ConversationConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.model, "llama3-8b-8192");
        assert_eq!(config.documents.chunk_size, 2000);
        assert_eq!(config.documents.chunk_overlap, 200);
        assert_eq!(config.conversation.context_window, 10);
        assert_eq!(config.cache_max_age(), Duration::from_secs(86_400));
        assert_eq!(config.reasoning.default_depth, 3);
    }

    #[test]
    fn test_legacy_env_fills_missing_keys() {
        let mut config = AppConfig::default();
        config.apply_legacy_env(|key| match key {
            "GROQ_API_KEY" => Some("gsk-test".to_string()),
            "BRAVE_API_KEY" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.llm.api_key.as_deref(), Some("gsk-test"));
        assert!(config.search.api_key.is_none());
        assert!(!config.search_enabled());
    }

    #[test]
    fn test_structured_key_wins_over_legacy_env() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("from-config".to_string());
        config.apply_legacy_env(|_| Some("from-env".to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("from-config"));
        assert_eq!(config.search.api_key.as_deref(), Some("from-env"));
    }
}
