//! News authenticity checks
//!
//! Fact-checking is done by an injected [`AuthenticityChecker`]. This module
//! adds caching, timeouts, bounded batch fan-out and the "unverified" result
//! returned when the checker cannot answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::cache::{DerivedArtifactCache, keys};
use crate::collaborators::AuthenticityChecker;
use crate::errors::{CoreError, Result};
use crate::fanout::{bounded_map, with_timeout};
use crate::types::ScoredItem;

/// Largest accepted batch
pub const MAX_BATCH_SIZE: usize = 50;

/// Upper bound on concurrent checks within a batch
pub const MAX_BATCH_CONCURRENCY: usize = 10;

/// Score given when nothing could be verified
pub const UNVERIFIED_SCORE: u8 = 50;

/// Confidence attached to a fallback result
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

const NEWS_TOPICS: &[&str] = &[
    "news",
    "politics",
    "business",
    "finance",
    "tech",
    "technology",
    "science",
    "health",
    "world",
    "breaking",
    "report",
    "ai/ml",
    "cybersecurity",
    "climate",
    "research",
];

const NEWS_KEYWORDS: &[&str] = &[
    "announced",
    "reported",
    "according to",
    "study",
    "research",
    "says",
    "said",
];

/// How much effort a check may spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckDepth {
    /// Claims only, few sources
    Quick,
    /// Default depth
    #[default]
    Standard,
    /// Full cross-referencing
    Thorough,
}

/// Overall verdict of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Key claims corroborated by independent sources
    Verified,
    /// Some claims corroborated, others unconfirmed
    PartiallyVerified,
    /// Nothing could be confirmed either way
    Unverified,
    /// Sources contradict the article
    Disputed,
}

impl VerificationStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::PartiallyVerified => "partially_verified",
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Disputed => "disputed",
        }
    }
}

/// A request to check one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticityRequest {
    /// Item the article belongs to; also the cache key
    pub item_id: String,
    /// Article URL
    pub url: String,
    /// Title or text as shown on the page
    #[serde(default)]
    pub text: String,
    /// Check depth
    #[serde(default)]
    pub check_depth: CheckDepth,
}

/// Outcome of a check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticityResult {
    /// Item that was checked
    pub item_id: String,
    /// 0-100, higher is more trustworthy
    pub authenticity_score: u8,
    /// Confidence in the assessment (0.0-1.0)
    pub confidence: f64,
    /// Overall verdict
    pub verification_status: VerificationStatus,
    /// Number of sources consulted
    #[serde(default)]
    pub sources_checked: u32,
    /// Sources agreeing with the article
    #[serde(default)]
    pub corroborating_count: u32,
    /// Sources disagreeing with the article
    #[serde(default)]
    pub conflicting_count: u32,
    /// Human-readable summary
    pub explanation: String,
    /// When the check completed
    pub checked_at: DateTime<Utc>,
    /// Wall time spent
    #[serde(default)]
    pub processing_time_ms: u64,
}

impl AuthenticityResult {
    /// Result used when the checker failed or timed out
    pub fn unverified(item_id: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            authenticity_score: UNVERIFIED_SCORE,
            confidence: FALLBACK_CONFIDENCE,
            verification_status: VerificationStatus::Unverified,
            sources_checked: 0,
            corroborating_count: 0,
            conflicting_count: 0,
            explanation: explanation.into(),
            checked_at: Utc::now(),
            processing_time_ms: 0,
        }
    }

    /// Copies the verdict onto a ranked item
    pub fn annotate(&self, item: &mut ScoredItem) {
        item.authenticity_score = Some(self.authenticity_score.min(100));
        item.authenticity_status = Some(self.verification_status.as_str().to_string());
        item.authenticity_explanation = Some(self.explanation.clone());
    }
}

/// Whether an item looks like a news article worth checking.
///
/// True if any topic is a news category (case-insensitive) or the text
/// contains a reporting keyword.
pub fn is_likely_news_article(topics: &[String], text: &str) -> bool {
    if topics
        .iter()
        .any(|t| NEWS_TOPICS.contains(&t.trim().to_lowercase().as_str()))
    {
        return true;
    }

    let text = text.to_lowercase();
    NEWS_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// Cached, time-bounded access to the authenticity checker
#[derive(Clone)]
pub struct AuthenticityService {
    cache: DerivedArtifactCache,
    checker: Arc<dyn AuthenticityChecker>,
    timeout: Duration,
}

impl AuthenticityService {
    /// Creates a service with a 30 second per-check timeout
    pub fn new(cache: DerivedArtifactCache, checker: Arc<dyn AuthenticityChecker>) -> Self {
        Self {
            cache,
            checker,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the per-check timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks one article. Failures produce an uncached "unverified" result.
    pub async fn check(&self, request: &AuthenticityRequest) -> AuthenticityResult {
        let started = Instant::now();
        let key = keys::authenticity(&request.item_id);

        let result = self
            .cache
            .get_or_compute(&key, self.cache.ttls().authenticity, || async {
                let mut result = with_timeout(self.timeout, self.checker.check(request)).await?;
                result.item_id = request.item_id.clone();
                result.authenticity_score = result.authenticity_score.min(100);
                result.processing_time_ms = started.elapsed().as_millis() as u64;
                Ok::<_, CoreError>(result)
            })
            .await;

        match result {
            Ok(result) => result,
            Err(e) => {
                warn!("Authenticity check failed for {}: {}", request.item_id, e);
                let explanation = if e.is_timeout() {
                    "Verification timed out.".to_string()
                } else {
                    format!("Verification error: {e}")
                };
                let mut fallback = AuthenticityResult::unverified(&request.item_id, explanation);
                fallback.processing_time_ms = started.elapsed().as_millis() as u64;
                fallback
            },
        }
    }

    /// Checks a batch of articles, returning results in request order.
    ///
    /// `max_concurrent` is clamped to 1..=10. Batches larger than
    /// [`MAX_BATCH_SIZE`] are rejected.
    pub async fn check_batch(
        &self,
        requests: &[AuthenticityRequest],
        max_concurrent: usize,
    ) -> Result<Vec<AuthenticityResult>> {
        if requests.len() > MAX_BATCH_SIZE {
            return Err(CoreError::InvalidInput(format!(
                "Batch size cannot exceed {MAX_BATCH_SIZE} items"
            )));
        }

        let limit = max_concurrent.clamp(1, MAX_BATCH_CONCURRENCY);
        info!(
            "Checking {} articles with concurrency {}",
            requests.len(),
            limit
        );

        Ok(bounded_map(requests, limit, |request| self.check(request)).await)
    }
}
