//! Persistence of affinity profiles
//!
//! Each profile is one JSON blob under `user:{user_id}`. Writes replace the
//! whole blob, so concurrent read-modify-write cycles for the same user would
//! lose updates. [`ProfileStore::update`] serialises those cycles per user
//! inside this process; separate processes sharing a store can still race.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::store::KeyValueStore;
use crate::types::AffinityProfile;

/// Store key of a user's profile
pub fn profile_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Loads, saves and updates profiles in a [`KeyValueStore`]
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ProfileStore {
    /// Creates a profile store over the given key/value store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Loads a profile, propagating store failures.
    ///
    /// A missing profile is `Ok(None)`. An undecodable blob is also
    /// `Ok(None)`: it cannot be recovered, and the next update replaces it.
    pub async fn try_load(&self, user_id: &str) -> Result<Option<AffinityProfile>> {
        let Some(raw) = self.store.get(&profile_key(user_id)).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<AffinityProfile>(&raw) {
            Ok(mut profile) => {
                // The key is authoritative even if the blob was written by hand.
                profile.user_id = user_id.to_string();
                Ok(Some(profile))
            },
            Err(e) => {
                warn!("Discarding unreadable profile {}: {}", user_id, e);
                Ok(None)
            },
        }
    }

    /// Loads a profile for reading.
    ///
    /// A missing profile, an unreachable store and an undecodable blob all
    /// yield `None`: the caller treats the user as new. Never use this as the
    /// base of a write; [`ProfileStore::update`] goes through
    /// [`ProfileStore::try_load`].
    pub async fn load(&self, user_id: &str) -> Option<AffinityProfile> {
        match self.try_load(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Failed to load profile {}: {}", user_id, e);
                None
            },
        }
    }

    /// Loads a profile, or returns a fresh one if none exists
    pub async fn load_or_default(&self, user_id: &str) -> AffinityProfile {
        match self.load(user_id).await {
            Some(profile) => profile,
            None => {
                debug!("Creating new profile for user {}", user_id);
                AffinityProfile::new(user_id)
            },
        }
    }

    /// Persists the whole profile
    pub async fn save(&self, profile: &AffinityProfile) -> Result<()> {
        let payload = serde_json::to_string(profile)?;
        self.store
            .set(&profile_key(&profile.user_id), payload)
            .await
    }

    /// Deletes a profile, including its interest embedding
    pub async fn clear(&self, user_id: &str) -> Result<bool> {
        let _guard = self.lock_for(user_id).lock_owned().await;
        let removed = self.store.delete(&profile_key(user_id)).await?;
        if removed {
            info!("Cleared profile for user {}", user_id);
        }
        Ok(removed)
    }

    /// Loads (or creates) the profile, applies `mutate`, and saves it.
    ///
    /// Updates for the same user are applied one at a time. The mutated
    /// profile is returned even when it was just created. If the store cannot
    /// be read, nothing is written and the error is returned.
    pub async fn update<F, R>(&self, user_id: &str, mutate: F) -> Result<(AffinityProfile, R)>
    where
        F: FnOnce(&mut AffinityProfile) -> R,
    {
        let lock = self.lock_for(user_id);
        let result: Result<(AffinityProfile, R)> = async {
            let _guard = lock.lock().await;
            let mut profile = match self.try_load(user_id).await? {
                Some(profile) => profile,
                None => {
                    debug!("Creating new profile for user {}", user_id);
                    AffinityProfile::new(user_id)
                },
            };
            let output = mutate(&mut profile);
            profile.updated_at = Utc::now();
            self.save(&profile).await?;
            Ok((profile, output))
        }
        .await;

        self.locks
            .remove_if(user_id, |_, entry| Arc::strong_count(entry) <= 2);

        result
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
