//! Voice onboarding sessions
//!
//! Session state lives in the [`KeyValueStore`] under `voice_session:{id}`
//! with a sliding TTL, so it survives restarts and is shared by every
//! process using the same store. Read-modify-write cycles on one session are
//! serialised inside this process.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{CoreError, Result};
use crate::store::KeyValueStore;
use crate::types::VoicePreferences;
use crate::voice::{PreferenceExtraction, merge_preferences};

/// Store key prefix for sessions
pub const SESSION_KEY_PREFIX: &str = "voice_session:";

/// Idle time after which a session expires
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Maximum number of live sessions
pub const DEFAULT_MAX_ACTIVE_SESSIONS: usize = 100;

/// Store key of a session
pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{session_id}")
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Conversation in progress
    Active,
    /// Conversation finished; preferences are final
    Ended,
}

/// A voice onboarding session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSession {
    /// Session identifier
    pub session_id: String,
    /// Owner of the session
    pub user_id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last recorded activity
    pub last_activity: DateTime<Utc>,
    /// Lifecycle state
    pub status: SessionStatus,
    /// Preferences merged from every extraction so far
    #[serde(default)]
    pub preferences: VoicePreferences,
    /// Number of extractions merged
    #[serde(default)]
    pub extraction_count: u32,
}

/// Stores voice sessions in a key/value store
#[derive(Clone)]
pub struct VoiceSessionStore {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    max_active: usize,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl VoiceSessionStore {
    /// Creates a session store with the default TTL and session limit
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_SESSION_TTL,
            max_active: DEFAULT_MAX_ACTIVE_SESSIONS,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Sets the idle TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the maximum number of live sessions
    pub fn with_max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }

    /// Starts a new session for a user
    pub async fn create(&self, user_id: &str) -> Result<VoiceSession> {
        let active = self.store.keys_with_prefix(SESSION_KEY_PREFIX).await?.len();
        if active >= self.max_active {
            warn!("Refusing new voice session: {} sessions active", active);
            return Err(CoreError::LimitExceeded(format!(
                "maximum of {} active voice sessions reached",
                self.max_active
            )));
        }

        let now = Utc::now();
        let session = VoiceSession {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            last_activity: now,
            status: SessionStatus::Active,
            preferences: VoicePreferences::default(),
            extraction_count: 0,
        };
        self.save(&session).await?;

        info!("Created voice session {} for user {}", session.session_id, user_id);
        Ok(session)
    }

    /// Loads a session. Expired and unreadable sessions are `None`.
    pub async fn get(&self, session_id: &str) -> Result<Option<VoiceSession>> {
        let Some(raw) = self.store.get(&session_key(session_id)).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Discarding unreadable voice session {}: {}", session_id, e);
                Ok(None)
            },
        }
    }

    /// Refreshes the activity time and TTL. Returns false if the session is gone.
    pub async fn touch(&self, session_id: &str) -> Result<bool> {
        let lock = self.lock_for(session_id);
        let result: Result<bool> = async {
            let _guard = lock.lock().await;
            let Some(mut session) = self.get(session_id).await? else {
                return Ok(false);
            };
            session.last_activity = Utc::now();
            self.save(&session).await?;
            Ok(true)
        }
        .await;

        self.release_lock(session_id);
        result
    }

    /// Merges an extraction into the session's preferences
    pub async fn record_extraction(
        &self,
        session_id: &str,
        extraction: &PreferenceExtraction,
    ) -> Result<VoiceSession> {
        let lock = self.lock_for(session_id);
        let result: Result<VoiceSession> = async {
            let _guard = lock.lock().await;
            let mut session = self
                .get(session_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("voice session {session_id}")))?;

            if session.status == SessionStatus::Active
                && merge_preferences(&mut session.preferences, extraction)
            {
                session.extraction_count += 1;
                debug!(
                    "Session {} now has {} topics",
                    session_id,
                    session.preferences.topics.len()
                );
            }
            session.last_activity = Utc::now();
            self.save(&session).await?;
            Ok(session)
        }
        .await;

        self.release_lock(session_id);
        result
    }

    /// Ends a session, removing it from the store.
    ///
    /// Returns the final state, or `None` if the session had already expired.
    pub async fn end(&self, session_id: &str) -> Result<Option<VoiceSession>> {
        let lock = self.lock_for(session_id);
        let removed: Result<Option<VoiceSession>> = async {
            let _guard = lock.lock().await;
            let Some(session) = self.get(session_id).await? else {
                return Ok(None);
            };
            self.store.delete(&session_key(session_id)).await?;
            Ok(Some(session))
        }
        .await;
        self.release_lock(session_id);

        let Some(mut session) = removed? else {
            return Ok(None);
        };

        session.status = SessionStatus::Ended;
        session.last_activity = Utc::now();
        info!(
            "Ended voice session {} with {} topics",
            session_id,
            session.preferences.topics.len()
        );
        Ok(Some(session))
    }

    /// All live sessions, ordered by id
    pub async fn list_active(&self) -> Result<Vec<VoiceSession>> {
        let mut sessions = Vec::new();
        for key in self.store.keys_with_prefix(SESSION_KEY_PREFIX).await? {
            let id = key.trim_start_matches(SESSION_KEY_PREFIX);
            if let Some(session) = self.get(id).await? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release_lock(&self, session_id: &str) {
        self.locks
            .remove_if(session_id, |_, entry| Arc::strong_count(entry) <= 2);
    }

    async fn save(&self, session: &VoiceSession) -> Result<()> {
        let payload = serde_json::to_string(session)?;
        self.store
            .setex(&session_key(&session.session_id), payload, self.ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKeyValueStore;
    use crate::types::Sentiment;
    use crate::voice::ExtractedTopic;

    fn sessions() -> VoiceSessionStore {
        VoiceSessionStore::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    fn jazz() -> PreferenceExtraction {
        PreferenceExtraction {
            topics: vec![ExtractedTopic {
                topic: "jazz".into(),
                sentiment: Some(Sentiment::Like),
                intensity: Some(0.9),
                ..Default::default()
            }],
            content_preferences: None,
            nothing_new: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = sessions();
        let session = store.create("u1").await.unwrap();

        let loaded = store.get(&session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.user_id, "u1");
        assert_eq!(loaded.status, SessionStatus::Active);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_extraction_merges() {
        let store = sessions();
        let session = store.create("u1").await.unwrap();

        store.record_extraction(&session.session_id, &jazz()).await.unwrap();
        let updated = store
            .record_extraction(&session.session_id, &PreferenceExtraction::default())
            .await
            .unwrap();

        assert_eq!(updated.extraction_count, 1);
        assert_eq!(updated.preferences.topics[0].topic, "jazz");
    }

    #[tokio::test]
    async fn test_record_extraction_unknown_session() {
        let err = sessions().record_extraction("nope", &jazz()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_extractions_all_merge() {
        let store = sessions();
        let session = store.create("u1").await.unwrap();

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                let session_id = session.session_id.clone();
                tokio::spawn(async move {
                    let extraction = PreferenceExtraction {
                        topics: vec![ExtractedTopic {
                            topic: format!("topic-{i}"),
                            sentiment: Some(Sentiment::Like),
                            intensity: Some(0.5),
                            ..Default::default()
                        }],
                        content_preferences: None,
                        nothing_new: false,
                    };
                    store.record_extraction(&session_id, &extraction).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let merged = store.get(&session.session_id).await.unwrap().unwrap();
        assert_eq!(merged.extraction_count, 10);
        assert_eq!(merged.preferences.topics.len(), 10);
    }

    #[tokio::test]
    async fn test_end_removes_session() {
        let store = sessions();
        let session = store.create("u1").await.unwrap();
        store.record_extraction(&session.session_id, &jazz()).await.unwrap();

        let ended = store.end(&session.session_id).await.unwrap().unwrap();
        assert_eq!(ended.status, SessionStatus::Ended);
        assert_eq!(ended.preferences.topics.len(), 1);

        assert!(store.get(&session.session_id).await.unwrap().is_none());
        assert!(store.end(&session.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sessions_expire() {
        let store = sessions().with_ttl(Duration::from_millis(20));
        let session = store.create("u1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!store.touch(&session.session_id).await.unwrap());
        assert!(store.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_limit() {
        let store = sessions().with_max_active(2);
        store.create("a").await.unwrap();
        store.create("b").await.unwrap();

        let err = store.create("c").await.unwrap_err();
        assert!(matches!(err, CoreError::LimitExceeded(_)));
        assert_eq!(store.list_active().await.unwrap().len(), 2);
    }
}
