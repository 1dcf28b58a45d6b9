use async_trait::async_trait;
use interestlens_core::cache::keys;
use interestlens_core::voice::ExtractedTopic;
use interestlens_core::{
    CacheConfig, ContentItem, CoreError, DerivedArtifactCache, Embedder, EventKind,
    InMemoryKeyValueStore, ItemEnricher, KeyValueStore, KeywordTopicClassifier,
    PreferenceExtraction, ProfileStore, Ranker, Result, Sentiment, SignalEvent,
    VoiceSessionStore, ingest,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("interestlens_core=debug")
        .with_test_writer()
        .try_init();
}

struct AxisEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for AxisEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("rocket") {
            Ok(vec![1.0, 0.0])
        } else {
            Ok(vec![0.0, 1.0])
        }
    }
}

struct DownStore;

#[async_trait]
impl KeyValueStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(CoreError::Store("connection refused".into()))
    }
    async fn set(&self, _key: &str, _value: String) -> Result<()> {
        Err(CoreError::Store("connection refused".into()))
    }
    async fn setex(&self, _key: &str, _value: String, _ttl: std::time::Duration) -> Result<()> {
        Err(CoreError::Store("connection refused".into()))
    }
    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(CoreError::Store("connection refused".into()))
    }
    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(CoreError::Store("connection refused".into()))
    }
}

#[tokio::test]
async fn events_shape_the_ranking() {
    init_tracing();

    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let cache = DerivedArtifactCache::new(store.clone(), CacheConfig::default());
    let profiles = ProfileStore::new(store.clone());
    let embedder = Arc::new(AxisEmbedder {
        calls: AtomicUsize::new(0),
    });
    let enricher = ItemEnricher::new(
        cache.clone(),
        Some(embedder.clone()),
        Arc::new(KeywordTopicClassifier::default()),
    );

    let items = enricher
        .enrich_all(vec![
            ContentItem::new("r1", "NASA rocket reaches orbit"),
            ContentItem::new("f1", "Chef shares a pasta recipe"),
        ])
        .await;
    assert_eq!(items[0].topics, vec!["space"]);

    let rocket_embedding = items[0].embedding.clone().unwrap();
    profiles
        .update("reader", |p| {
            ingest(
                p,
                &SignalEvent::new(EventKind::ThumbsUp, ["space"]).with_embedding(rocket_embedding),
            )
        })
        .await
        .unwrap();

    let profile = profiles.load("reader").await.unwrap();
    assert_eq!(profile.interest_embedding, Some(vec![1.0, 0.0]));

    let ranked = Ranker::default().rank(&items, Some(&profile));
    assert_eq!(ranked[0].id, "r1");
    assert!(ranked[0].score > ranked[1].score);
    assert!(ranked[0].why.contains("space"));

    // Embeddings are cached under the item id.
    assert!(cache.get::<Vec<f32>>(&keys::item("r1")).await.is_some());
    enricher
        .enrich(ContentItem::new("r1", "NASA rocket reaches orbit"))
        .await;
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn voice_session_completes_onboarding() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let sessions = VoiceSessionStore::new(store.clone());
    let profiles = ProfileStore::new(store);

    let session = sessions.create("listener").await.unwrap();
    sessions
        .record_extraction(
            &session.session_id,
            &PreferenceExtraction {
                topics: vec![
                    ExtractedTopic {
                        topic: "jazz".into(),
                        sentiment: Some(Sentiment::Like),
                        intensity: Some(0.9),
                        ..Default::default()
                    },
                    ExtractedTopic {
                        topic: "reality tv".into(),
                        sentiment: Some(Sentiment::Dislike),
                        intensity: Some(0.6),
                        ..Default::default()
                    },
                ],
                content_preferences: None,
                nothing_new: false,
            },
        )
        .await
        .unwrap();

    let ended = sessions.end(&session.session_id).await.unwrap().unwrap();
    let (profile, _) = profiles
        .update("listener", |p| {
            ingest(p, &SignalEvent::voice_complete(ended.preferences.clone()))
        })
        .await
        .unwrap();

    assert!(profile.voice_onboarding_complete);
    assert_eq!(profile.topic_affinity.get("jazz"), Some(&0.9));
    assert_eq!(profile.topic_affinity.get("reality tv"), Some(&-0.6));

    let jazz = ContentItem::new("j", "").with_topics(["jazz"]);
    let tv = ContentItem::new("t", "").with_topics(["reality tv"]);
    let ranked = Ranker::default().rank(&[tv, jazz], Some(&profile));
    assert_eq!(ranked[0].id, "j");
    assert!(ranked[1].why.contains("rather avoid"));
}

#[test]
fn unavailable_store_degrades_to_uncached() {
    tokio_test::block_on(async {
        let store: Arc<dyn KeyValueStore> = Arc::new(DownStore);
        let cache = DerivedArtifactCache::new(store.clone(), CacheConfig::default());
        let profiles = ProfileStore::new(store);

        let value: std::result::Result<u32, CoreError> = cache
            .get_or_compute("item:x", std::time::Duration::from_secs(60), || async { Ok(7) })
            .await;
        assert_eq!(value.unwrap(), 7);

        // Missing profile, not an error.
        assert!(profiles.load("anyone").await.is_none());
        assert_eq!(cache.stats().store_errors, 2);
    });
}
