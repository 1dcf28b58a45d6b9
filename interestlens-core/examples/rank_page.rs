//! Ranking a page for a user who has clicked on a few finance stories
//!
//! Run with `cargo run --example rank_page -p interestlens-core`.

use interestlens_core::{
    CacheConfig, ContentItem, DerivedArtifactCache, EventKind, InMemoryKeyValueStore,
    ItemEnricher, KeyValueStore, KeywordTopicClassifier, ProfileStore, Ranker, Result,
    SignalEvent, ingest,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("interestlens_core=debug,rank_page=info")
        .init();

    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let cache = DerivedArtifactCache::new(store.clone(), CacheConfig::default());
    let profiles = ProfileStore::new(store);
    let enricher = ItemEnricher::new(cache.clone(), None, Arc::new(KeywordTopicClassifier::default()));

    for _ in 0..3 {
        profiles
            .update("demo-user", |profile| {
                ingest(profile, &SignalEvent::new(EventKind::Click, ["finance"]))
            })
            .await?;
    }

    let page = vec![
        ContentItem::new("1", "Cup final tonight: preview of the match"),
        ContentItem::new("2", "Central bank holds interest rate as markets wait"),
        ContentItem::new("3", "Chef shares a weeknight pasta recipe"),
        ContentItem::new("4", "NASA rocket reaches orbit"),
    ];
    let items = enricher.enrich_all(page).await;

    let profile = profiles.load_or_default("demo-user").await;
    for scored in Ranker::default().rank(&items, Some(&profile)) {
        println!("{:>3}  {:<4} {:?}  {}", scored.score, scored.id, scored.topics, scored.why);
    }

    println!("\nCache: {:?}", cache.stats());
    Ok(())
}
