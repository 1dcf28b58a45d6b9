//! Item enrichment: embeddings and topics for page items
//!
//! Items arrive from the extension with text only. The enricher fills in
//! embeddings and topics through the derived-artifact cache, falling back to
//! "unknown" when a collaborator fails or times out. Scoring handles missing
//! values with its own defaults.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{DerivedArtifactCache, keys};
use crate::collaborators::{Embedder, TopicClassifier};
use crate::fanout::{DEFAULT_MAX_CONCURRENT, bounded_map, with_timeout};
use crate::types::ContentItem;

/// Default timeout for a single collaborator call
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Fills in missing embeddings and topics
#[derive(Clone)]
pub struct ItemEnricher {
    cache: DerivedArtifactCache,
    embedder: Option<Arc<dyn Embedder>>,
    classifier: Arc<dyn TopicClassifier>,
    timeout: Duration,
    max_concurrent: usize,
}

impl ItemEnricher {
    /// Creates an enricher.
    ///
    /// Without an embedder, items keep whatever embedding they arrived with.
    pub fn new(
        cache: DerivedArtifactCache,
        embedder: Option<Arc<dyn Embedder>>,
        classifier: Arc<dyn TopicClassifier>,
    ) -> Self {
        Self {
            cache,
            embedder,
            classifier,
            timeout: DEFAULT_COLLABORATOR_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Sets the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the fan-out limit
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Enriches all items, preserving their order
    pub async fn enrich_all(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        bounded_map(items, self.max_concurrent, |item| self.enrich(item)).await
    }

    /// Enriches one item. Never fails.
    pub async fn enrich(&self, mut item: ContentItem) -> ContentItem {
        if item.embedding.is_none() {
            item.embedding = self.embedding_for(&item).await;
        }
        if item.topics.is_empty() {
            item.topics = self.topics_for(&item).await;
        }
        item
    }

    async fn embedding_for(&self, item: &ContentItem) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        if item.text.trim().is_empty() {
            return None;
        }

        let key = keys::item(&item.id);
        let result = self
            .cache
            .get_or_compute(&key, self.cache.ttls().item, || {
                with_timeout(self.timeout, embedder.embed(&item.text))
            })
            .await;

        match result {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("No embedding for item {}: {}", item.id, e);
                None
            },
        }
    }

    async fn topics_for(&self, item: &ContentItem) -> Vec<String> {
        if item.text.trim().is_empty() {
            return Vec::new();
        }

        let key = keys::topics(&item.id);
        let result = self
            .cache
            .get_or_compute(&key, self.cache.ttls().item, || {
                with_timeout(self.timeout, self.classifier.classify(&item.text))
            })
            .await;

        match result {
            Ok(topics) => topics,
            Err(e) => {
                debug!("No topics for item {}: {}", item.id, e);
                Vec::new()
            },
        }
    }
}
