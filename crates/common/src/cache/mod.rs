//! In-memory search result cache
//!
//! Provides:
//! - Deterministic keys over (normalized query, result limit)
//! - Age-based validity checked on read
//! - Get-or-fetch against a search provider
//! - Explicit clearing and statistics
//!
//! Entries are never evicted on read. A stale entry reads as a miss, is
//! overwritten by the next fetch for the same key, and otherwise stays in
//! the map until [`SearchCache::clear`].

use crate::errors::Result;
use crate::models::SearchResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Stored search results and the moment they were fetched
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub results: Vec<SearchResult>,
    pub created_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, max_age: Duration) -> bool {
        self.created_at.elapsed() < max_age
    }
}

/// Snapshot of cache contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    /// Share of entries that would still be served, in percent
    pub hit_potential: f64,
}

/// Search results keyed by query signature
pub struct SearchCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_age: Duration,
}

impl SearchCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age,
        }
    }

    /// Build the cache key for a query and result limit
    pub fn cache_key(query: &str, limit: usize) -> String {
        let normalized = query.trim().to_lowercase();
        let digest = Sha256::digest(format!("{}_{}", normalized, limit).as_bytes());
        hex::encode(digest)
    }

    /// Fresh results for the query, if any
    pub async fn lookup(&self, query: &str, limit: usize) -> Option<Vec<SearchResult>> {
        let key = Self::cache_key(query, limit);
        let entries = self.entries.read().await;

        match entries.get(&key) {
            Some(entry) if entry.is_fresh(self.max_age) => {
                debug!(key = %key, "Search cache hit");
                Some(entry.results.clone())
            }
            Some(_) => {
                debug!(key = %key, "Search cache entry expired");
                None
            }
            None => {
                debug!(key = %key, "Search cache miss");
                None
            }
        }
    }

    /// Store results for the query, replacing any previous entry
    pub async fn insert(&self, query: &str, limit: usize, results: Vec<SearchResult>) {
        let key = Self::cache_key(query, limit);
        let entry = CacheEntry {
            results,
            created_at: Instant::now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Return cached results when fresh, otherwise run `loader` and cache its output.
    ///
    /// The flag is `true` when the results came from the cache. Loader errors are
    /// returned unchanged and nothing is stored.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        query: &str,
        limit: usize,
        loader: F,
    ) -> Result<(Vec<SearchResult>, bool)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<SearchResult>>>,
    {
        if let Some(cached) = self.lookup(query, limit).await {
            crate::metrics::record_cache(true);
            return Ok((cached, true));
        }
        crate::metrics::record_cache(false);

        let results = loader().await?;
        self.insert(query, limit, results.clone()).await;

        Ok((results, false))
    }

    /// Remove every entry, returning how many were dropped
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let total_entries = entries.len();
        let valid_entries = entries
            .values()
            .filter(|e| e.is_fresh(self.max_age))
            .count();
        let hit_potential = if total_entries == 0 {
            0.0
        } else {
            valid_entries as f64 / total_entries as f64 * 100.0
        };

        CacheStats {
            total_entries,
            valid_entries,
            expired_entries: total_entries - valid_entries,
            hit_potential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> Vec<SearchResult> {
        vec![
            SearchResult::new("Quantum computing basics", "https://a.example", "Qubits"),
            SearchResult::new("Error correction", "https://b.example", "Surface codes"),
        ]
    }

    #[test]
    fn test_cache_key_normalization() {
        assert_eq!(
            SearchCache::cache_key("  Quantum Computing ", 5),
            SearchCache::cache_key("quantum computing", 5)
        );
        assert_ne!(
            SearchCache::cache_key("quantum computing", 5),
            SearchCache::cache_key("quantum computing", 3)
        );
        assert_eq!(SearchCache::cache_key("x", 1).len(), 64);
    }

    #[tokio::test]
    async fn test_second_identical_call_is_cached() {
        let cache = SearchCache::new(Duration::from_secs(86_400));
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(sample())
        };

        let (first, cached) = cache.get_or_fetch("quantum computing", 5, fetch).await.unwrap();
        assert!(!cached);
        assert_eq!(cache.len().await, 1);

        let (second, cached) = cache.get_or_fetch("quantum computing", 5, fetch).await.unwrap();
        assert!(cached);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_a_miss_but_stays_stored() {
        let cache = SearchCache::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(sample())
        };

        cache.get_or_fetch("quantum computing", 5, fetch).await.unwrap();
        let (_, cached) = cache.get_or_fetch("quantum computing", 5, fetch).await.unwrap();

        assert!(!cached);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 1);

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.hit_potential, 0.0);

        assert_eq!(cache.clear().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        let cache = SearchCache::new(Duration::from_secs(60));
        let result = cache
            .get_or_fetch("anything", 3, || async {
                Err(AppError::ProviderFailure {
                    provider: "brave".into(),
                    message: "down".into(),
                })
            })
            .await;

        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_stats_on_fresh_cache() {
        let cache = SearchCache::new(Duration::from_secs(60));
        cache.insert("a", 5, sample()).await;
        cache.insert("b", 5, vec![]).await;

        let stats = cache.stats().await;
        assert_eq!(stats.valid_entries, 2);
        assert_eq!(stats.hit_potential, 100.0);
    }
}
