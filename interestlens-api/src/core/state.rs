use interestlens_core::{
    ActivityLog, ArticleExtractor, ArticleService, AuthenticityChecker, AuthenticityService,
    DerivedArtifactCache, Embedder, ExplanationEngine, ItemEnricher, KeyValueStore,
    KeywordTopicClassifier, ProfileStore, Ranker, ScoringEngine, TopicClassifier,
    VoiceSessionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::config::Settings;
use super::embedding::HttpEmbedder;
use super::fetcher::{ExtractionMode, HttpArticleFetcher};

/// External collaborators wired into the services
#[derive(Clone)]
pub struct Collaborators {
    pub embedder: Option<Arc<dyn Embedder>>,
    pub classifier: Arc<dyn TopicClassifier>,
    pub extractor: Arc<dyn ArticleExtractor>,
    pub fallback_extractor: Option<Arc<dyn ArticleExtractor>>,
    pub authenticity: Option<Arc<dyn AuthenticityChecker>>,
}

impl Collaborators {
    /// HTTP-backed collaborators described by the settings
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let collab = &settings.collaborators;
        let client = reqwest::Client::builder()
            .user_agent(collab.user_agent.clone())
            .timeout(Duration::from_secs(collab.timeout_seconds))
            .build()?;

        let embedder = collab.embedding_endpoint.as_ref().map(|endpoint| {
            info!("Using embedding endpoint {}", endpoint);
            Arc::new(HttpEmbedder::new(
                client.clone(),
                endpoint.clone(),
                collab.embedding_api_key.clone(),
                collab.embedding_model.clone(),
            )) as Arc<dyn Embedder>
        });
        if embedder.is_none() {
            info!("No embedding endpoint configured, text similarity uses item-supplied embeddings only");
        }

        Ok(Self {
            embedder,
            classifier: Arc::new(KeywordTopicClassifier::default()),
            extractor: Arc::new(HttpArticleFetcher::new(
                client.clone(),
                ExtractionMode::Readable,
            )),
            fallback_extractor: Some(Arc::new(HttpArticleFetcher::new(
                client,
                ExtractionMode::FullPage,
            ))),
            authenticity: None,
        })
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub cache: DerivedArtifactCache,
    pub profiles: ProfileStore,
    pub enricher: ItemEnricher,
    pub ranker: Ranker,
    pub articles: ArticleService,
    pub authenticity: Option<AuthenticityService>,
    pub sessions: VoiceSessionStore,
    pub activity: ActivityLog,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn KeyValueStore>,
        collaborators: Collaborators,
    ) -> Self {
        let timeout = Duration::from_secs(settings.collaborators.timeout_seconds);
        let cache = DerivedArtifactCache::new(store.clone(), settings.cache.to_cache_config());

        let enricher = ItemEnricher::new(
            cache.clone(),
            collaborators.embedder,
            collaborators.classifier,
        )
        .with_timeout(timeout)
        .with_max_concurrent(settings.collaborators.max_concurrent);

        let ranker = Ranker::new(
            ScoringEngine::new(settings.scoring.to_scoring_config()),
            ExplanationEngine::default(),
            settings.scoring.result_limit,
        );

        let mut articles =
            ArticleService::new(cache.clone(), collaborators.extractor).with_timeout(timeout);
        if let Some(fallback) = collaborators.fallback_extractor {
            articles = articles.with_fallback(fallback);
        }

        let authenticity = collaborators
            .authenticity
            .map(|checker| AuthenticityService::new(cache.clone(), checker));

        let sessions = VoiceSessionStore::new(store.clone())
            .with_ttl(Duration::from_secs(settings.sessions.ttl_seconds))
            .with_max_active(settings.sessions.max_active);

        let activity = ActivityLog::new(store.clone())
            .with_ttl(Duration::from_secs(settings.activity.ttl_seconds))
            .with_max_records(settings.activity.max_records);

        Self {
            profiles: ProfileStore::new(store),
            settings: Arc::new(settings),
            cache,
            enricher,
            ranker,
            articles,
            authenticity,
            sessions,
            activity,
        }
    }
}
