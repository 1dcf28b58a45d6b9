//! Type definitions for the InterestLens core
//!
//! This module contains the profile, content item and voice preference types
//! shared by signal ingestion, scoring and the HTTP gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a user feels about a topic mentioned during voice onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// The user wants more of this topic
    #[default]
    Like,
    /// The user wants less of this topic
    Dislike,
    /// Mentioned without a clear direction
    Neutral,
}

/// A topic preference produced by the voice/text onboarding collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPreference {
    /// Topic label as spoken or classified
    pub topic: String,
    /// Direction of the preference
    #[serde(default)]
    pub sentiment: Sentiment,
    /// Strength of the preference (0.0 - 1.0)
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    /// More specific topics within this one that the user likes
    #[serde(default)]
    pub subtopics: Vec<String>,
    /// More specific topics within this one that the user wants to avoid
    #[serde(default)]
    pub avoid_subtopics: Vec<String>,
}

fn default_intensity() -> f64 {
    0.7
}

impl TopicPreference {
    /// Creates a preference without subtopics
    pub fn new(topic: impl Into<String>, sentiment: Sentiment, intensity: f64) -> Self {
        Self {
            topic: topic.into(),
            sentiment,
            intensity,
            subtopics: Vec::new(),
            avoid_subtopics: Vec::new(),
        }
    }

    /// Signed weight of the preference: intensity for likes, negated for
    /// dislikes, zero for neutral mentions.
    pub fn resolved_weight(&self) -> f64 {
        match self.sentiment {
            Sentiment::Like => self.intensity,
            Sentiment::Dislike => -self.intensity,
            Sentiment::Neutral => 0.0,
        }
    }
}

/// Content format preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPreference {
    /// Formats the user asked for (articles, videos, podcasts...)
    #[serde(default)]
    pub preferred_formats: Vec<String>,
    /// Formats the user wants to avoid
    #[serde(default)]
    pub avoid_formats: Vec<String>,
    /// "short", "medium", "long" or "any"
    #[serde(default = "default_length")]
    pub preferred_length: String,
}

fn default_length() -> String {
    "any".to_string()
}

impl Default for ContentPreference {
    fn default() -> Self {
        Self {
            preferred_formats: Vec::new(),
            avoid_formats: Vec::new(),
            preferred_length: default_length(),
        }
    }
}

/// Preferences extracted from voice onboarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VoicePreferences {
    /// Per-topic preferences
    #[serde(default)]
    pub topics: Vec<TopicPreference>,
    /// Format preferences, if any were mentioned
    #[serde(default)]
    pub content: Option<ContentPreference>,
    /// Transcript the preferences were extracted from
    #[serde(default)]
    pub raw_transcript: String,
    /// Extraction confidence (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f64,
}

impl VoicePreferences {
    /// Preferences with a like sentiment
    pub fn likes(&self) -> impl Iterator<Item = &TopicPreference> {
        self.topics
            .iter()
            .filter(|t| t.sentiment == Sentiment::Like)
    }

    /// Preferences with a dislike sentiment
    pub fn dislikes(&self) -> impl Iterator<Item = &TopicPreference> {
        self.topics
            .iter()
            .filter(|t| t.sentiment == Sentiment::Dislike)
    }
}

/// Per-user interest profile
///
/// Persisted as a single JSON blob under `user:{user_id}`. Topic affinities are
/// kept in an ordered map so that "first matching key" lookups during scoring
/// are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityProfile {
    /// Opaque user identity
    pub user_id: String,
    /// Topic label -> signed affinity
    #[serde(default)]
    pub topic_affinity: BTreeMap<String, f64>,
    /// Domain -> time-weighted visit aggregate (minutes)
    #[serde(default)]
    pub domain_affinity: BTreeMap<String, f64>,
    /// EMA of embeddings of positively engaged items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_embedding: Option<Vec<f32>>,
    /// Preferences captured by voice onboarding
    #[serde(default)]
    pub voice_preferences: Option<VoicePreferences>,
    /// Whether voice onboarding finished
    #[serde(default)]
    pub voice_onboarding_complete: bool,
    /// Number of ingested events
    #[serde(default)]
    pub interaction_count: u64,
    /// Last mutation time
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl AffinityProfile {
    /// Creates an empty profile for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            topic_affinity: BTreeMap::new(),
            domain_affinity: BTreeMap::new(),
            interest_embedding: None,
            voice_preferences: None,
            voice_onboarding_complete: false,
            interaction_count: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether the profile carries any personalization signal at all.
    ///
    /// A profile without topic affinities, voice preference topics or an
    /// interest embedding is scored in limited mode.
    pub fn has_signals(&self) -> bool {
        !self.topic_affinity.is_empty()
            || self
                .voice_preferences
                .as_ref()
                .is_some_and(|v| !v.topics.is_empty())
            || self
                .interest_embedding
                .as_ref()
                .is_some_and(|e| !e.is_empty())
    }

    /// Topics sorted by affinity, highest first. Ties are broken by name.
    pub fn top_topics(&self, limit: usize) -> Vec<(String, f64)> {
        let mut topics: Vec<(String, f64)> = self
            .topic_affinity
            .iter()
            .map(|(topic, affinity)| (topic.clone(), *affinity))
            .collect();
        topics.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        topics.truncate(limit);
        topics
    }
}

/// A page item to be ranked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Upstream-assigned opaque identifier
    pub id: String,
    /// Raw item text
    #[serde(default)]
    pub text: String,
    /// Link target, if the item is a link
    #[serde(default)]
    pub href: Option<String>,
    /// Text embedding, if already known
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Topic labels, if already known
    #[serde(default)]
    pub topics: Vec<String>,
}

impl ContentItem {
    /// Creates an item with text only
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            href: None,
            embedding: None,
            topics: Vec::new(),
        }
    }

    /// Builder-style topics setter
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style embedding setter
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A ranked item returned to the extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// Item identifier
    pub id: String,
    /// Interest score (0 - 100)
    pub score: u8,
    /// Topics used for scoring
    pub topics: Vec<String>,
    /// Short justification
    pub why: String,
    /// Authenticity score, when a fact-check ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticity_score: Option<u8>,
    /// Authenticity status, when a fact-check ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticity_status: Option<String>,
    /// Authenticity explanation, when a fact-check ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticity_explanation: Option<String>,
}

/// Top topics of a profile, returned alongside rankings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileSummary {
    /// (topic, affinity) pairs, highest first
    pub top_topics: Vec<(String, f64)>,
    /// Number of ingested events
    pub interaction_count: u64,
    /// Whether voice onboarding finished
    pub voice_onboarding_complete: bool,
}

impl ProfileSummary {
    /// Summarises a profile with its `limit` strongest topics
    pub fn from_profile(profile: &AffinityProfile, limit: usize) -> Self {
        Self {
            top_topics: profile.top_topics(limit),
            interaction_count: profile.interaction_count,
            voice_onboarding_complete: profile.voice_onboarding_complete,
        }
    }
}
