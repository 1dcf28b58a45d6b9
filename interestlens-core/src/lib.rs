//! # InterestLens core
//!
//! Adaptive interest scoring and derived-artifact caching for the InterestLens
//! browser extension backend.
//!
//! ## Features
//!
//! - **Affinity profiles**: per-user topic, domain and embedding interests that
//!   evolve under clicks, thumbs, dwell time, page visits and voice onboarding
//! - **Scoring**: a bounded 0-100 score blending embedding similarity, topic
//!   affinity, voice sentiment and prominence with configurable weights
//! - **Explanations**: deterministic, template-based "why" strings
//! - **Caching**: cache-aside over a TTL key/value store for embeddings,
//!   topics, articles, previews and fact-check results
//! - **Collaborator contracts**: embedders, topic classifiers, article
//!   extractors and authenticity checkers are injected behind traits
//!
//! ## Quick Start
//!
//! ```rust
//! use interestlens_core::{
//!     AffinityProfile, ContentItem, EventKind, Ranker, SignalEvent, ingest,
//! };
//!
//! let mut profile = AffinityProfile::new("user-1");
//! for _ in 0..3 {
//!     ingest(&mut profile, &SignalEvent::new(EventKind::Click, ["finance"]));
//! }
//!
//! let items = vec![
//!     ContentItem::new("a", "Rates hold steady").with_topics(["finance"]),
//!     ContentItem::new("b", "Cup final tonight").with_topics(["sports"]),
//! ];
//! let ranked = Ranker::default().rank(&items, Some(&profile));
//! assert_eq!(ranked[0].id, "a");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod activity;
pub mod article;
pub mod authenticity;
pub mod cache;
pub mod collaborators;
pub mod enrich;
mod errors;
pub mod explain;
pub mod fanout;
pub mod profile_store;
pub mod ranking;
pub mod scoring;
pub mod sessions;
pub mod signals;
pub mod store;
mod types;
pub mod voice;

// Re-export main types and functions
pub use activity::{Activity, ActivityHistory, ActivityKind, ActivityLog, HistoryQuery, TrackSummary};
pub use article::{ArticleContent, ArticleService, UrlPreview};
pub use authenticity::{
    AuthenticityRequest, AuthenticityResult, AuthenticityService, CheckDepth,
    VerificationStatus, is_likely_news_article,
};
pub use cache::{CacheConfig, CacheStats, CacheTtls, DerivedArtifactCache};
pub use collaborators::{
    ArticleExtractor, AuthenticityChecker, Embedder, KeywordTopicClassifier, TopicClassifier,
};
pub use enrich::ItemEnricher;
pub use errors::{CoreError, Result};
pub use explain::{Explanation, ExplanationBasis, ExplanationEngine};
pub use profile_store::ProfileStore;
pub use ranking::Ranker;
pub use scoring::{ScoreBreakdown, ScoringConfig, ScoringEngine, ScoringMode, ScoringWeights};
pub use sessions::{SessionStatus, VoiceSession, VoiceSessionStore};
pub use signals::{EventKind, IngestReport, SignalEvent, ingest};
pub use store::{InMemoryKeyValueStore, KeyValueStore};
pub use types::{
    AffinityProfile, ContentItem, ContentPreference, ProfileSummary, ScoredItem, Sentiment,
    TopicPreference, VoicePreferences,
};
pub use voice::{PreferenceExtraction, merge_preferences, summarize};
