//! Web search provider abstraction
//!
//! Provides:
//! - `WebSearchProvider` trait
//! - Brave Search client
//! - Static provider for tests and offline development
//! - `SearchService` combining a provider with the result cache

use crate::cache::SearchCache;
use crate::config::SearchConfig;
use crate::errors::{AppError, Result};
use crate::models::SearchResult;
use crate::resilience::{call_with_retry, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Trait for web search backends
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Return up to `limit` results for the query
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Get the provider name
    fn name(&self) -> &str;
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveItem>,
}

#[derive(Deserialize)]
struct BraveItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

/// Brave Search web API client
pub struct BraveSearchClient {
    client: reqwest::Client,
    api_key: String,
    config: SearchConfig,
    policy: RetryPolicy,
}

impl BraveSearchClient {
    pub fn new(api_key: String, config: SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let policy = RetryPolicy::new("brave", config.timeout_secs, config.max_retries);

        Ok(Self { client, api_key, config, policy })
    }

    async fn make_request(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let count = limit.to_string();
        let response = self.client
            .get(&self.config.api_base)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("search_lang", self.config.language.as_str()),
                ("country", self.config.country.as_str()),
                ("safesearch", self.config.safesearch.as_str()),
                ("freshness", self.config.freshness.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus {
                provider: "brave".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: BraveResponse = response.json().await
            .map_err(|e| AppError::ProviderFailure {
                provider: "brave".to_string(),
                message: format!("Failed to parse search response: {}", e),
            })?;

        Ok(parsed
            .web
            .map(|web| {
                web.results
                    .into_iter()
                    .map(|item| SearchResult::new(item.title, item.url, item.description))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl WebSearchProvider for BraveSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let result = call_with_retry(&self.policy, || self.make_request(query, limit)).await;

        let count = result.as_ref().map(|r| r.len()).unwrap_or(0);
        crate::metrics::record_search(start.elapsed().as_secs_f64(), count, result.is_ok());

        result
    }

    fn name(&self) -> &str {
        "brave"
    }
}

/// Provider returning a fixed result list and counting calls
#[derive(Default)]
pub struct StaticSearch {
    results: Vec<SearchResult>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self { results, fail: false, calls: AtomicUsize::new(0) }
    }

    /// A provider whose every call fails
    pub fn failing() -> Self {
        Self { results: Vec::new(), fail: true, calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearchProvider for StaticSearch {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::ProviderFailure {
                provider: "static".to_string(),
                message: "search backend unreachable".to_string(),
            });
        }
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Create the configured search provider, or `None` when no key is set
///
/// Missing credentials disable search rather than failing startup.
pub fn create_search_provider(config: &SearchConfig) -> Result<Option<Arc<dyn WebSearchProvider>>> {
    match &config.api_key {
        Some(key) => {
            let client = BraveSearchClient::new(key.clone(), config.clone())?;
            Ok(Some(Arc::new(client)))
        }
        None => {
            tracing::warn!(
                provider = "brave",
                "Web search disabled: BRAVE_API_KEY not configured"
            );
            Ok(None)
        }
    }
}

/// Results of one cache-backed search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub cached: bool,
}

/// Search provider fronted by the shared result cache
#[derive(Clone)]
pub struct SearchService {
    provider: Option<Arc<dyn WebSearchProvider>>,
    cache: Arc<SearchCache>,
}

impl SearchService {
    pub fn new(provider: Option<Arc<dyn WebSearchProvider>>, cache: Arc<SearchCache>) -> Self {
        Self { provider, cache }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    /// Search through the cache; fails with `ProviderUnavailable` when disabled
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchOutcome> {
        let provider = self.provider.as_ref().ok_or_else(|| AppError::ProviderUnavailable {
            provider: "brave".to_string(),
            message: "Web search not available".to_string(),
        })?;

        let (results, cached) = self
            .cache
            .get_or_fetch(query, limit, || provider.search(query, limit))
            .await?;

        tracing::debug!(
            provider = provider.name(),
            result_count = results.len(),
            cached,
            "Web search completed"
        );

        Ok(SearchOutcome { results, cached })
    }
}
