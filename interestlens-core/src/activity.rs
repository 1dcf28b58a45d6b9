//! Browsing activity log
//!
//! The extension reports page visits and clicks in batches. Each user's log is
//! a single JSON document under `activity:{user_id}` holding the most recent
//! activities plus per-domain and per-category totals. The document expires
//! after 30 days without new activity.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::signals::SignalEvent;
use crate::store::KeyValueStore;

/// How long a log lives after its last update
pub const DEFAULT_ACTIVITY_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Maximum number of activities kept per user
pub const DEFAULT_MAX_ACTIVITIES: usize = 10_000;

const MAX_STATS_ENTRIES: usize = 20;
const MAX_TOP_CATEGORIES: usize = 10;

/// Store key of a user's activity log
pub fn activity_key(user_id: &str) -> String {
    format!("activity:{user_id}")
}

/// Kind of a reported activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Time spent on a page
    PageVisit,
    /// A link click
    Click,
    /// Anything else the extension may send
    #[serde(other)]
    Other,
}

/// A single reported activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity kind
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Client timestamp in milliseconds
    pub timestamp: i64,
    /// Kind-specific payload
    #[serde(default)]
    pub data: serde_json::Value,
    /// Page the activity happened on
    #[serde(default)]
    pub source_url: String,
    /// Domain the activity happened on
    #[serde(default)]
    pub source_domain: String,
}

/// Payload of a page visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageVisitData {
    /// Page URL
    #[serde(default)]
    pub url: String,
    /// Page domain
    #[serde(default)]
    pub domain: String,
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Time on page in milliseconds
    #[serde(default)]
    pub time_spent: u64,
    /// Scroll depth in percent
    #[serde(default)]
    pub scroll_depth: u8,
    /// Whether the page looked like an article
    #[serde(default)]
    pub is_article: bool,
    /// Categories detected on the page
    #[serde(default)]
    pub categories: Vec<String>,
    /// Clicks made on the page
    #[serde(default)]
    pub click_count: u32,
}

impl Activity {
    /// Page visit payload, if this is a page visit with a readable payload
    pub fn page_visit(&self) -> Option<PageVisitData> {
        if self.kind != ActivityKind::PageVisit {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }

    /// Profile signal carried by this activity.
    ///
    /// Only page visits with categories or a domain produce one.
    pub fn to_signal(&self) -> Option<SignalEvent> {
        let visit = self.page_visit()?;
        let domain = Some(visit.domain.as_str())
            .filter(|d| !d.is_empty())
            .or(Some(self.source_domain.as_str()).filter(|d| !d.is_empty()))
            .map(str::to_string);

        if visit.categories.is_empty() && domain.is_none() {
            return None;
        }
        Some(SignalEvent::page_visit(
            visit.categories,
            domain,
            visit.time_spent,
        ))
    }
}

/// Visit count and time for a domain or category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VisitTotals {
    /// Number of batches that reported this key
    pub visits: u64,
    /// Total time in milliseconds
    pub time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ActivityStats {
    #[serde(default)]
    domains: BTreeMap<String, VisitTotals>,
    #[serde(default)]
    categories: BTreeMap<String, VisitTotals>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ActivityDocument {
    #[serde(default)]
    activities: Vec<Activity>,
    #[serde(default)]
    stats: ActivityStats,
    #[serde(default)]
    updated_at: i64,
}

/// Outcome of recording a batch
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TrackSummary {
    /// Number of activities accepted
    pub activities_processed: usize,
    /// Categories seen in this batch, sorted
    pub categories_updated: Vec<String>,
}

/// Filters and paging for history queries
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryQuery {
    /// Page size
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Number of newest activities to skip
    #[serde(default)]
    pub offset: usize,
    /// Only activities of this kind
    #[serde(default)]
    pub type_filter: Option<ActivityKind>,
    /// Only activities on this domain
    #[serde(default)]
    pub domain_filter: Option<String>,
}

fn default_limit() -> usize {
    100
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            type_filter: None,
            domain_filter: None,
        }
    }
}

/// Totals for one domain or category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedTotals {
    /// Domain or category
    pub name: String,
    /// Number of batches that reported it
    pub visit_count: u64,
    /// Total time in milliseconds
    pub total_time_spent: u64,
}

/// A page of history plus aggregate statistics
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ActivityHistory {
    /// Matching activities, newest first
    pub activities: Vec<Activity>,
    /// Number of matching activities before paging
    pub total_count: usize,
    /// Top domains by time spent
    pub domain_stats: Vec<NamedTotals>,
    /// Top categories by time spent
    pub category_stats: Vec<NamedTotals>,
    /// Names of the top categories
    pub top_categories: Vec<String>,
}

fn ranked(totals: &BTreeMap<String, VisitTotals>) -> Vec<NamedTotals> {
    let mut ranked: Vec<NamedTotals> = totals
        .iter()
        .map(|(name, t)| NamedTotals {
            name: name.clone(),
            visit_count: t.visits,
            total_time_spent: t.time,
        })
        .collect();
    ranked.sort_by(|a, b| b.total_time_spent.cmp(&a.total_time_spent));
    ranked.truncate(MAX_STATS_ENTRIES);
    ranked
}

/// Per-user activity logs in a key/value store
#[derive(Clone)]
pub struct ActivityLog {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    max_records: usize,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ActivityLog {
    /// Creates a log with a 30 day TTL and a 10 000 record cap
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_ACTIVITY_TTL,
            max_records: DEFAULT_MAX_ACTIVITIES,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Sets the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the record cap
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    /// Appends a batch, dropping the oldest records beyond the cap, and
    /// updates the domain and category totals
    pub async fn record(&self, user_id: &str, batch: &[Activity]) -> Result<TrackSummary> {
        let lock = self
            .locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.record_locked(user_id, batch).await
        };

        self.locks
            .remove_if(user_id, |_, entry| Arc::strong_count(entry) <= 2);
        result
    }

    async fn record_locked(&self, user_id: &str, batch: &[Activity]) -> Result<TrackSummary> {
        let mut document = self.load(user_id).await?;

        let mut category_times: BTreeMap<String, u64> = BTreeMap::new();
        let mut domain_times: BTreeMap<String, u64> = BTreeMap::new();

        for activity in batch {
            document.activities.push(activity.clone());

            let Some(visit) = activity.page_visit() else {
                continue;
            };
            for category in &visit.categories {
                let category = category.trim().to_lowercase();
                if !category.is_empty() {
                    *category_times.entry(category).or_default() += visit.time_spent;
                }
            }
            let domain = if visit.domain.is_empty() {
                activity.source_domain.clone()
            } else {
                visit.domain.clone()
            };
            if !domain.is_empty() {
                *domain_times.entry(domain).or_default() += visit.time_spent;
            }
        }

        if document.activities.len() > self.max_records {
            let excess = document.activities.len() - self.max_records;
            document.activities.drain(..excess);
        }

        for (domain, time) in &domain_times {
            let totals = document.stats.domains.entry(domain.clone()).or_default();
            totals.visits += 1;
            totals.time += time;
        }
        for (category, time) in &category_times {
            let totals = document.stats.categories.entry(category.clone()).or_default();
            totals.visits += 1;
            totals.time += time;
        }
        document.updated_at = Utc::now().timestamp_millis();

        let payload = serde_json::to_string(&document)?;
        self.store
            .setex(&activity_key(user_id), payload, self.ttl)
            .await?;

        debug!(
            "Recorded {} activities for {} ({} stored)",
            batch.len(),
            user_id,
            document.activities.len()
        );

        Ok(TrackSummary {
            activities_processed: batch.len(),
            categories_updated: category_times.into_keys().collect(),
        })
    }

    /// Returns a page of history, newest first, with aggregate statistics
    pub async fn history(&self, user_id: &str, query: &HistoryQuery) -> Result<ActivityHistory> {
        let document = self.load(user_id).await?;

        let filtered: Vec<&Activity> = document
            .activities
            .iter()
            .rev()
            .filter(|a| query.type_filter.is_none_or(|kind| a.kind == kind))
            .filter(|a| {
                query
                    .domain_filter
                    .as_deref()
                    .is_none_or(|domain| a.source_domain == domain)
            })
            .collect();

        let category_stats = ranked(&document.stats.categories);
        let top_categories = category_stats
            .iter()
            .take(MAX_TOP_CATEGORIES)
            .map(|c| c.name.clone())
            .collect();

        Ok(ActivityHistory {
            total_count: filtered.len(),
            activities: filtered
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .cloned()
                .collect(),
            domain_stats: ranked(&document.stats.domains),
            category_stats,
            top_categories,
        })
    }

    /// Deletes a user's log
    pub async fn clear(&self, user_id: &str) -> Result<bool> {
        self.store.delete(&activity_key(user_id)).await
    }

    async fn load(&self, user_id: &str) -> Result<ActivityDocument> {
        let Some(raw) = self.store.get(&activity_key(user_id)).await? else {
            return Ok(ActivityDocument::default());
        };
        match serde_json::from_str(&raw) {
            Ok(document) => Ok(document),
            Err(e) => {
                warn!("Resetting unreadable activity log for {}: {}", user_id, e);
                Ok(ActivityDocument::default())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::EventKind;
    use crate::store::InMemoryKeyValueStore;
    use serde_json::json;

    fn visit(ts: i64, domain: &str, categories: &[&str], time_spent: u64) -> Activity {
        Activity {
            kind: ActivityKind::PageVisit,
            timestamp: ts,
            data: json!({
                "url": format!("https://{domain}/"),
                "domain": domain,
                "timeSpent": time_spent,
                "categories": categories,
            }),
            source_url: format!("https://{domain}/"),
            source_domain: domain.to_string(),
        }
    }

    fn click(ts: i64, domain: &str) -> Activity {
        Activity {
            kind: ActivityKind::Click,
            timestamp: ts,
            data: json!({ "url": "https://x.test/a", "isArticleLink": true }),
            source_url: String::new(),
            source_domain: domain.to_string(),
        }
    }

    fn log() -> ActivityLog {
        ActivityLog::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    #[test]
    fn test_activity_wire_format() {
        let activity: Activity = serde_json::from_value(json!({
            "type": "page_visit",
            "timestamp": 1,
            "data": { "domain": "a.com", "timeSpent": 60000, "categories": ["Science"] },
            "sourceDomain": "a.com"
        }))
        .unwrap();

        assert_eq!(activity.kind, ActivityKind::PageVisit);
        let signal = activity.to_signal().unwrap();
        assert_eq!(signal.kind, EventKind::PageVisit);
        assert_eq!(signal.duration_ms, Some(60000));
        assert_eq!(signal.domain.as_deref(), Some("a.com"));

        let other: Activity =
            serde_json::from_value(json!({ "type": "scroll", "timestamp": 2 })).unwrap();
        assert_eq!(other.kind, ActivityKind::Other);
        assert!(other.to_signal().is_none());
    }

    #[tokio::test]
    async fn test_record_and_history() {
        let log = log();
        let summary = log
            .record(
                "u1",
                &[
                    visit(1, "a.com", &["Science", " science "], 1000),
                    click(2, "a.com"),
                    visit(3, "b.com", &["music"], 5000),
                ],
            )
            .await
            .unwrap();

        assert_eq!(summary.activities_processed, 3);
        assert_eq!(summary.categories_updated, vec!["music", "science"]);

        let history = log.history("u1", &HistoryQuery::default()).await.unwrap();
        assert_eq!(history.total_count, 3);
        assert_eq!(history.activities[0].timestamp, 3);
        assert_eq!(history.domain_stats[0].name, "b.com");
        assert_eq!(history.top_categories, vec!["music", "science"]);
        assert_eq!(history.category_stats[1].total_time_spent, 2000);
    }

    #[tokio::test]
    async fn test_history_filters_and_paging() {
        let log = log();
        log.record(
            "u1",
            &[visit(1, "a.com", &[], 10), click(2, "a.com"), click(3, "b.com")],
        )
        .await
        .unwrap();

        let clicks = HistoryQuery {
            type_filter: Some(ActivityKind::Click),
            ..Default::default()
        };
        assert_eq!(log.history("u1", &clicks).await.unwrap().total_count, 2);

        let on_a = HistoryQuery {
            domain_filter: Some("a.com".into()),
            limit: 1,
            offset: 1,
            ..Default::default()
        };
        let page = log.history("u1", &on_a).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.activities.len(), 1);
        assert_eq!(page.activities[0].timestamp, 1);
    }

    #[tokio::test]
    async fn test_oldest_records_dropped() {
        let log = log().with_max_records(3);
        let batch: Vec<Activity> = (0..5).map(|i| click(i, "a.com")).collect();
        log.record("u1", &batch).await.unwrap();

        let history = log.history("u1", &HistoryQuery::default()).await.unwrap();
        let stamps: Vec<i64> = history.activities.iter().map(|a| a.timestamp).collect();
        assert_eq!(stamps, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn test_clear() {
        let log = log();
        log.record("u1", &[click(1, "a.com")]).await.unwrap();

        assert!(log.clear("u1").await.unwrap());
        let history = log.history("u1", &HistoryQuery::default()).await.unwrap();
        assert_eq!(history.total_count, 0);
    }
}
