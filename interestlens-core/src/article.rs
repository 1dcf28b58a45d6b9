//! Article extraction with caching and fallback
//!
//! Article content and URL previews are keyed by the hash of the normalized
//! URL. Extraction goes to the primary extractor first; if it fails or times
//! out the fallback extractor is tried. Only successful extractions are cached.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{DerivedArtifactCache, keys, normalize_url};
use crate::collaborators::ArticleExtractor;
use crate::enrich::DEFAULT_COLLABORATOR_TIMEOUT;
use crate::errors::{CoreError, Result};
use crate::fanout::with_timeout;

/// Length of the excerpt kept alongside the full text
pub const EXCERPT_CHARS: usize = 500;

/// Content extracted from an article URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    /// Source URL
    pub url: String,
    /// Article headline
    pub title: String,
    /// Byline, if found
    #[serde(default)]
    pub author: Option<String>,
    /// Publication date as printed on the page
    #[serde(default)]
    pub publication_date: Option<String>,
    /// Host the article was served from
    pub source_domain: String,
    /// Publication name, if found
    #[serde(default)]
    pub source_name: Option<String>,
    /// Readable body text
    pub full_text: String,
    /// First [`EXCERPT_CHARS`] characters of the body
    pub excerpt: String,
}

impl ArticleContent {
    /// Builds content from a title and body, deriving domain and excerpt
    pub fn new(url: impl Into<String>, title: impl Into<String>, full_text: impl Into<String>) -> Self {
        let url = url.into();
        let full_text = full_text.into();
        Self {
            source_domain: domain_of(&url),
            excerpt: excerpt_of(&full_text),
            url,
            title: title.into(),
            author: None,
            publication_date: None,
            source_name: None,
            full_text,
        }
    }
}

/// A compact preview of a linked page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlPreview {
    /// Requested URL
    pub url: String,
    /// Page title, empty when extraction failed
    pub title: String,
    /// Short summary of the page
    pub excerpt: String,
    /// Host of the URL
    pub domain: String,
    /// Byline, if found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Publication date, if found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Publication name, if found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl UrlPreview {
    fn from_article(url: &str, article: &ArticleContent) -> Self {
        Self {
            url: url.to_string(),
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            domain: article.source_domain.clone(),
            author: article.author.clone(),
            published_date: article.publication_date.clone(),
            source_name: article.source_name.clone(),
        }
    }

    fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            excerpt: String::new(),
            domain: domain_of(url),
            author: None,
            published_date: None,
            source_name: None,
        }
    }
}

/// Host part of a URL, lower-cased, without credentials or port
pub fn domain_of(url: &str) -> String {
    let normalized = normalize_url(url);
    let rest = normalized
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&normalized);
    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or(authority);
    host.split(':').next().unwrap_or(host).to_string()
}

/// First [`EXCERPT_CHARS`] characters of `text`, cut on a char boundary
pub fn excerpt_of(text: &str) -> String {
    text.trim().chars().take(EXCERPT_CHARS).collect()
}

/// Fetches article content and previews through the cache
#[derive(Clone)]
pub struct ArticleService {
    cache: DerivedArtifactCache,
    primary: Arc<dyn ArticleExtractor>,
    fallback: Option<Arc<dyn ArticleExtractor>>,
    timeout: Duration,
}

impl ArticleService {
    /// Creates a service with a primary extractor and no fallback
    pub fn new(cache: DerivedArtifactCache, primary: Arc<dyn ArticleExtractor>) -> Self {
        Self {
            cache,
            primary,
            fallback: None,
            timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    /// Sets the extractor used when the primary one fails
    pub fn with_fallback(mut self, fallback: Arc<dyn ArticleExtractor>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Sets the per-extraction timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the article behind `url`, extracting it on a cache miss
    pub async fn fetch(&self, url: &str) -> Result<ArticleContent> {
        if url.trim().is_empty() {
            return Err(CoreError::InvalidInput("url must not be empty".into()));
        }

        let key = keys::article(url);
        self.cache
            .get_or_compute(&key, self.cache.ttls().article, || self.extract(url))
            .await
    }

    /// Returns a preview of `url`.
    ///
    /// Never fails: if nothing could be extracted the preview carries only
    /// the URL and its domain, and is not cached.
    pub async fn preview(&self, url: &str) -> UrlPreview {
        let key = keys::preview(url);
        let result = self
            .cache
            .get_or_compute(&key, self.cache.ttls().preview, || async {
                self.fetch(url)
                    .await
                    .map(|article| UrlPreview::from_article(url, &article))
            })
            .await;

        match result {
            Ok(preview) => preview,
            Err(e) => {
                debug!("Preview unavailable for {}: {}", url, e);
                UrlPreview::empty(url)
            },
        }
    }

    async fn extract(&self, url: &str) -> Result<ArticleContent> {
        let primary = with_timeout(self.timeout, self.primary.extract(url)).await;
        let error = match primary {
            Ok(article) => return Ok(article),
            Err(e) => e,
        };

        let Some(fallback) = self.fallback.as_ref() else {
            return Err(error);
        };

        warn!(
            "Extractor {} failed for {}: {}; trying {}",
            self.primary.name(),
            url,
            error,
            fallback.name()
        );
        with_timeout(self.timeout, fallback.extract(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::store::InMemoryKeyValueStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeExtractor {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeExtractor {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ArticleExtractor for FakeExtractor {
        fn name(&self) -> &str {
            self.name
        }

        async fn extract(&self, url: &str) -> Result<ArticleContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CoreError::collaborator(self.name, "blocked"));
            }
            Ok(ArticleContent::new(url, format!("{} title", self.name), "Body text."))
        }
    }

    fn cache() -> DerivedArtifactCache {
        DerivedArtifactCache::new(
            Arc::new(InMemoryKeyValueStore::new()),
            CacheConfig::default(),
        )
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://News.Example.com/a/b?x=1"), "news.example.com");
        assert_eq!(domain_of("http://user@host.io:8080/"), "host.io");
        assert_eq!(domain_of("example.org/path"), "example.org");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let text = "é".repeat(600);
        assert_eq!(excerpt_of(&text).chars().count(), EXCERPT_CHARS);
    }

    #[tokio::test]
    async fn test_fetch_is_cached_by_normalized_url() {
        let primary = FakeExtractor::new("browser", false);
        let service = ArticleService::new(cache(), primary.clone());

        let first = service.fetch("https://Example.com/story/").await.unwrap();
        let second = service.fetch("https://example.com/story#comments").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_used_on_primary_failure() {
        let primary = FakeExtractor::new("browser", true);
        let fallback = FakeExtractor::new("http", false);
        let service = ArticleService::new(cache(), primary.clone()).with_fallback(fallback.clone());

        let article = service.fetch("https://example.com/a").await.unwrap();
        assert_eq!(article.title, "http title");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let primary = FakeExtractor::new("browser", true);
        let service = ArticleService::new(cache(), primary.clone());

        assert!(service.fetch("https://example.com/a").await.is_err());
        assert!(service.fetch("https://example.com/a").await.is_err());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_preview() {
        let service = ArticleService::new(cache(), FakeExtractor::new("browser", false));
        let preview = service.preview("https://example.com/a").await;
        assert_eq!(preview.title, "browser title");
        assert_eq!(preview.excerpt, "Body text.");
        assert_eq!(preview.domain, "example.com");

        let failing = ArticleService::new(cache(), FakeExtractor::new("browser", true));
        let preview = failing.preview("https://example.com/a").await;
        assert_eq!(preview.title, "");
        assert_eq!(preview.domain, "example.com");
    }
}
