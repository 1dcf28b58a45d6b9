//! In-memory storage implementation
//!
//! Stores data in a `DashMap` with a per-entry expiry instant. Expired
//! entries are dropped lazily on read and periodically by the cleanup task.
//! Data is lost when the process exits.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::Result;

use super::traits::KeyValueStore;

#[derive(Clone, Debug)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory implementation of KeyValueStore
///
/// Cloning is cheap and clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<DashMap<String, StoredValue>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including ones that expired but
    /// have not been purged yet
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Spawns a background task that purges expired entries every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let removed = store.purge_expired();
                debug!(
                    "Store cleanup: removed {} expired entries, {} remaining",
                    removed,
                    store.len()
                );
            }
        })
    }

    fn insert(&self, key: &str, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), StoredValue { value, expires_at });
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };

        if entry.is_expired(now) {
            drop(entry);
            self.entries.remove_if(key, |_, stored| stored.is_expired(now));
            debug!("Store entry expired: {}", key);
            return Ok(None);
        }

        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.insert(key, value, None);
        Ok(())
    }

    async fn setex(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.insert(key, value, Some(ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
