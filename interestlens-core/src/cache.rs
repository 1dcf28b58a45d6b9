//! Cache-aside wrapper for expensive derived artifacts
//!
//! Item embeddings, topic classifications, article extractions, URL previews
//! and fact-check results are pure functions of their key, so they are cached
//! in the shared [`KeyValueStore`] with a TTL. There is no size-based
//! eviction: growth is bounded by TTL and key cardinality.
//!
//! The cache never fails closed. If the store is unreachable every read is a
//! miss and every write is a logged no-op, so callers keep working without
//! deduplication.

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::store::KeyValueStore;

/// TTLs for each artifact family
#[derive(Debug, Clone)]
pub struct CacheTtls {
    /// Item embeddings and topic classifications
    pub item: Duration,
    /// Extracted article content
    pub article: Duration,
    /// Authenticity (fact-check) results
    pub authenticity: Duration,
    /// URL previews
    pub preview: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            item: Duration::from_secs(3600),         // 1 hour
            article: Duration::from_secs(3600),      // 1 hour
            authenticity: Duration::from_secs(3600), // 1 hour
            preview: Duration::from_secs(900),       // 15 minutes
        }
    }
}

/// Configuration for the derived-artifact cache
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Per-family TTLs
    pub ttls: CacheTtls,
    /// Collapse concurrent misses on the same key into one computation.
    ///
    /// When disabled, two concurrent misses may both compute and the later
    /// write wins, which is harmless because computations are idempotent.
    pub coalesce_misses: bool,
}

/// Key builders for the cached artifact families
pub mod keys {
    use super::url_hash;

    /// Embedding of an item, keyed by the upstream item id
    pub fn item(item_id: &str) -> String {
        format!("item:{item_id}")
    }

    /// Topic classification of an item, keyed by the upstream item id
    pub fn topics(item_id: &str) -> String {
        format!("topics:{item_id}")
    }

    /// Extracted article content, keyed by the normalized URL hash
    pub fn article(url: &str) -> String {
        format!("article:{}", url_hash(url))
    }

    /// Authenticity result for an item
    pub fn authenticity(item_id: &str) -> String {
        format!("authenticity:{item_id}")
    }

    /// URL preview, keyed by the normalized URL hash
    pub fn preview(url: &str) -> String {
        format!("preview:{}", url_hash(url))
    }
}

/// Normalizes a URL so trivially different spellings share a cache entry.
///
/// Trims whitespace, lower-cases the scheme and host, drops the fragment and
/// any trailing slash on the path. Query strings are kept as-is.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);

    let (scheme, rest) = match without_fragment.split_once("://") {
        Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
        None => (None, without_fragment),
    };

    let (authority, path_and_query) = match rest.find(['/', '?']) {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    let (path, query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    };
    let path = path.trim_end_matches('/');

    let mut normalized = String::with_capacity(without_fragment.len());
    if let Some(scheme) = scheme {
        normalized.push_str(&scheme);
        normalized.push_str("://");
    }
    normalized.push_str(&authority.to_ascii_lowercase());
    normalized.push_str(path);
    if let Some(query) = query {
        normalized.push('?');
        normalized.push_str(query);
    }
    normalized
}

/// Stable content address of a URL: hex SHA-256 of its normalized form
pub fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_url(url).as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Default)]
struct Counters {
    hits: AtomicUsize,
    misses: AtomicUsize,
    writes: AtomicUsize,
    compute_failures: AtomicUsize,
    store_errors: AtomicUsize,
}

/// Generic cache-aside wrapper over a [`KeyValueStore`]
#[derive(Clone)]
pub struct DerivedArtifactCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    store: Arc<dyn KeyValueStore>,
    config: CacheConfig,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    counters: Counters,
}

impl DerivedArtifactCache {
    /// Creates a cache over the given store
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                config,
                in_flight: DashMap::new(),
                counters: Counters::default(),
            }),
        }
    }

    /// Per-family TTLs this cache was configured with
    pub fn ttls(&self) -> &CacheTtls {
        &self.inner.config.ttls
    }

    /// Returns the cached value if present and unexpired.
    ///
    /// Store failures and undecodable payloads are reported as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.read(key).await;
        if value.is_some() {
            self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for key: {}", key);
        } else {
            self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache miss for key: {}", key);
        }
        value
    }

    /// Unconditionally stores `value` under `key` for `ttl`.
    ///
    /// Store failures are logged and swallowed.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize cache value for {}: {}", key, e);
                return;
            },
        };

        match self.inner.store.setex(key, payload, ttl).await {
            Ok(()) => {
                self.inner.counters.writes.fetch_add(1, Ordering::Relaxed);
                debug!("Cached value for key: {} (ttl {:?})", key, ttl);
            },
            Err(e) => {
                self.inner
                    .counters
                    .store_errors
                    .fetch_add(1, Ordering::Relaxed);
                warn!("Cache write failed for {}: {}", key, e);
            },
        }
    }

    /// Removes a cached value
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.inner.store.delete(key).await {
            self.inner
                .counters
                .store_errors
                .fetch_add(1, Ordering::Relaxed);
            warn!("Cache invalidation failed for {}: {}", key, e);
        }
    }

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// `compute` runs at most once per call. If it fails nothing is written
    /// and the error is returned unchanged so the caller can apply its own
    /// fallback. Timeouts around external calls are the caller's job.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        if !self.inner.config.coalesce_misses {
            return self.compute_and_store(key, ttl, compute).await;
        }

        let lock = self
            .inner
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            // Another caller may have filled the entry while we waited.
            match self.read::<T>(key).await {
                Some(value) => {
                    self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                    Ok(value)
                },
                None => self.compute_and_store(key, ttl, compute).await,
            }
        };

        self.inner
            .in_flight
            .remove_if(key, |_, entry| Arc::strong_count(entry) <= 2);

        result
    }

    async fn compute_and_store<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match compute().await {
            Ok(value) => {
                self.put(key, &value, ttl).await;
                Ok(value)
            },
            Err(e) => {
                self.inner
                    .counters
                    .compute_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!("Compute failed for {}: {}", key, e);
                Err(e)
            },
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.inner.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                self.inner
                    .counters
                    .store_errors
                    .fetch_add(1, Ordering::Relaxed);
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            },
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            },
        }
    }

    /// Snapshot of cache counters
    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        let hits = counters.hits.load(Ordering::Relaxed);
        let misses = counters.misses.load(Ordering::Relaxed);

        CacheStats {
            hits,
            misses,
            writes: counters.writes.load(Ordering::Relaxed),
            compute_failures: counters.compute_failures.load(Ordering::Relaxed),
            store_errors: counters.store_errors.load(Ordering::Relaxed),
            in_flight: self.inner.in_flight.len(),
            hit_rate: if hits + misses > 0 {
                hits as f64 / (hits + misses) as f64
            } else {
                0.0
            },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Reads served from the store
    pub hits: usize,
    /// Reads that found nothing usable
    pub misses: usize,
    /// Successful writes
    pub writes: usize,
    /// Compute functions that returned an error
    pub compute_failures: usize,
    /// Store operations that failed
    pub store_errors: usize,
    /// Keys with a coalesced computation in progress
    pub in_flight: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CoreError, Result as CoreResult};
    use crate::store::InMemoryKeyValueStore;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::atomic::AtomicU32;

    /// A store whose backend is unreachable
    struct DownStore;

    #[async_trait]
    impl KeyValueStore for DownStore {
        async fn get(&self, _key: &str) -> CoreResult<Option<String>> {
            Err(CoreError::Store("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: String) -> CoreResult<()> {
            Err(CoreError::Store("connection refused".into()))
        }
        async fn setex(&self, _key: &str, _value: String, _ttl: Duration) -> CoreResult<()> {
            Err(CoreError::Store("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> CoreResult<bool> {
            Err(CoreError::Store("connection refused".into()))
        }
        async fn keys_with_prefix(&self, _prefix: &str) -> CoreResult<Vec<String>> {
            Err(CoreError::Store("connection refused".into()))
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Article {
        title: String,
        words: usize,
    }

    fn memory_cache(coalesce_misses: bool) -> DerivedArtifactCache {
        DerivedArtifactCache::new(
            Arc::new(InMemoryKeyValueStore::new()),
            CacheConfig {
                coalesce_misses,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let cache = memory_cache(false);
        let article = Article {
            title: "Rust 2024".into(),
            words: 900,
        };

        cache.put("article:abc", &article, Duration::from_secs(60)).await;
        let cached: Option<Article> = cache.get("article:abc").await;

        assert_eq!(cached, Some(article));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_get_miss_is_none() {
        let cache = memory_cache(false);
        let cached: Option<Vec<f32>> = cache.get("item:missing").await;

        assert!(cached.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_computes_once_then_hits() {
        let cache = memory_cache(false);
        let calls = AtomicU32::new(0);

        let first: Vec<f32> = cache
            .get_or_compute("item:1", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CoreError>(vec![0.1, 0.2])
            })
            .await
            .unwrap();
        let second: Vec<f32> = cache
            .get_or_compute("item:1", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CoreError>(vec![9.9])
            })
            .await
            .unwrap();

        assert_eq!(first, vec![0.1, 0.2]);
        assert_eq!(second, vec![0.1, 0.2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get::<Vec<f32>>("item:1").await, Some(vec![0.1, 0.2]));
    }

    #[tokio::test]
    async fn test_compute_failure_is_not_cached() {
        let cache = memory_cache(false);

        let result: std::result::Result<Vec<f32>, CoreError> = cache
            .get_or_compute("item:2", Duration::from_secs(60), || async {
                Err(CoreError::Timeout { seconds: 5 })
            })
            .await;

        assert!(matches!(result, Err(CoreError::Timeout { seconds: 5 })));
        assert!(cache.get::<Vec<f32>>("item:2").await.is_none());
        assert_eq!(cache.stats().compute_failures, 1);
        assert_eq!(cache.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = memory_cache(false);
        cache.put("preview:x", &"hello", Duration::from_millis(10)).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get::<String>("preview:x").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = memory_cache(false);
        cache.put("authenticity:1", &42u8, Duration::from_secs(60)).await;
        cache.invalidate("authenticity:1").await;

        assert!(cache.get::<u8>("authenticity:1").await.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_uncached() {
        let cache = DerivedArtifactCache::new(Arc::new(DownStore), CacheConfig::default());
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value: u32 = cache
                .get_or_compute("item:3", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CoreError>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stats = cache.stats();
        assert_eq!(stats.writes, 0);
        assert!(stats.store_errors >= 4);
    }

    #[tokio::test]
    async fn test_coalesced_misses_compute_once() {
        let cache = memory_cache(true);
        let calls = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute("article:same", Duration::from_secs(60), || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, CoreError>("body".to_string())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "body");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("  HTTPS://Example.COM/News/Story/#comments "),
            "https://example.com/News/Story"
        );
        assert_eq!(
            normalize_url("https://example.com/a?id=1#top"),
            "https://example.com/a?id=1"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
    }

    #[test]
    fn test_article_key_is_stable_across_spellings() {
        assert_eq!(
            keys::article("https://Example.com/story/"),
            keys::article("https://example.com/story#section")
        );
        assert_ne!(
            keys::article("https://example.com/story"),
            keys::article("https://example.com/other")
        );
        assert!(keys::article("https://example.com").starts_with("article:"));
        assert_eq!(keys::item("abc"), "item:abc");
        assert_eq!(keys::authenticity("abc"), "authenticity:abc");
    }
}
