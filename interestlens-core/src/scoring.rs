//! Multi-factor interest scoring for page items.
//!
//! This module implements the scoring algorithm that combines:
//! - Text similarity (item embedding vs. the profile's interest embedding)
//! - Topic affinity (fuzzy topic match, logistic squashing)
//! - Voice sentiment (liked/disliked topics from voice onboarding)
//! - Prominence (reserved slot, currently constant)
//!
//! Scoring is pure: embeddings and topics are inputs, never fetched here.

use serde::{Deserialize, Serialize};

use crate::types::{AffinityProfile, ContentItem, Sentiment};

/// Score returned when no personalization signal is available
pub const LIMITED_MODE_SCORE: u8 = 50;

/// Similarity used when either embedding is missing
pub const DEFAULT_TEXT_SIMILARITY: f64 = 0.5;

/// Placeholder prominence until layout-derived input is wired in
pub const DEFAULT_PROMINENCE: f64 = 0.5;

/// Voice modifier gained per unit of intensity for a liked topic
pub const VOICE_LIKE_FACTOR: f64 = 0.4;

/// Voice modifier lost per unit of intensity for a disliked topic
pub const VOICE_DISLIKE_FACTOR: f64 = 0.5;

/// Weights of the four score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight for text similarity (0.0-1.0)
    pub text: f64,

    /// Weight for topic affinity (0.0-1.0)
    pub topic: f64,

    /// Weight for voice sentiment (0.0-1.0)
    pub voice: f64,

    /// Weight for prominence (0.0-1.0)
    pub prominence: f64,
}

impl ScoringWeights {
    /// Weights used once voice onboarding is complete
    pub const VOICE_COMPLETE: Self = Self {
        text: 0.20,
        topic: 0.35,
        voice: 0.30,
        prominence: 0.15,
    };

    /// Weights used before voice onboarding is complete
    pub const VOICE_INCOMPLETE: Self = Self {
        text: 0.35,
        topic: 0.40,
        voice: 0.10,
        prominence: 0.15,
    };

    /// Returns the total of all weights (should be 1.0).
    pub fn total(&self) -> f64 {
        self.text + self.topic + self.voice + self.prominence
    }

    /// Whether the weights sum to 1.0 within tolerance
    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() < 0.01
    }
}

/// Configuration for the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weights once voice onboarding is complete
    pub voice_complete: ScoringWeights,
    /// Weights before voice onboarding is complete
    pub voice_incomplete: ScoringWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            voice_complete: ScoringWeights::VOICE_COMPLETE,
            voice_incomplete: ScoringWeights::VOICE_INCOMPLETE,
        }
    }
}

/// Which weighting produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// No usable profile: flat score
    Limited,
    /// Profile signals with voice onboarding complete
    VoiceComplete,
    /// Profile signals without voice onboarding
    VoiceIncomplete,
}

/// Individual score components and the final score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Weighting used
    pub mode: ScoringMode,

    /// Cosine similarity to the interest embedding, or 0.5 if unavailable
    pub text_similarity: f64,

    /// Squashed mean topic affinity (0.0-1.0)
    pub topic_score: f64,

    /// Signed voice sentiment shift around the 0.5 neutral point
    pub voice_modifier: f64,

    /// Prominence component (0.0-1.0)
    pub prominence: f64,

    /// Final score (0-100)
    pub score: u8,
}

impl ScoreBreakdown {
    /// Combines components with the given weights into a bounded score
    pub fn from_components(
        mode: ScoringMode,
        text_similarity: f64,
        topic_score: f64,
        voice_modifier: f64,
        prominence: f64,
        weights: &ScoringWeights,
    ) -> Self {
        let raw = weights.text * text_similarity
            + weights.topic * topic_score
            + weights.voice * (0.5 + voice_modifier)
            + weights.prominence * prominence;

        Self {
            mode,
            text_similarity,
            topic_score,
            voice_modifier,
            prominence,
            score: to_score(raw),
        }
    }

    /// The flat limited-mode result
    pub fn limited() -> Self {
        Self {
            mode: ScoringMode::Limited,
            text_similarity: DEFAULT_TEXT_SIMILARITY,
            topic_score: 0.0,
            voice_modifier: 0.0,
            prominence: DEFAULT_PROMINENCE,
            score: LIMITED_MODE_SCORE,
        }
    }
}

fn to_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return LIMITED_MODE_SCORE;
    }
    (raw * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Cosine similarity of two vectors.
///
/// Pairs coordinates up to the shorter length. A zero-norm vector yields 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Logistic function mapping any real to (0, 1)
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Case-insensitive, bidirectional substring match between two topic labels.
///
/// Empty labels never match.
pub fn topics_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Affinity of the first profile key matching `topic`.
///
/// An exact case-insensitive match wins; otherwise keys are tried in sorted
/// order and the first substring match is used.
pub fn matching_affinity(profile: &AffinityProfile, topic: &str) -> Option<f64> {
    let wanted = topic.trim().to_lowercase();
    profile
        .topic_affinity
        .iter()
        .find(|(key, _)| key.trim().to_lowercase() == wanted)
        .or_else(|| {
            profile
                .topic_affinity
                .iter()
                .find(|(key, _)| topics_match(key, topic))
        })
        .map(|(_, affinity)| *affinity)
}

/// Computes interest scores for content items.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    /// Creates a new ScoringEngine with the given configuration.
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Picks the weighting for a profile
    pub fn mode(&self, profile: Option<&AffinityProfile>) -> ScoringMode {
        match profile {
            Some(p) if p.has_signals() => {
                if p.voice_onboarding_complete {
                    ScoringMode::VoiceComplete
                } else {
                    ScoringMode::VoiceIncomplete
                }
            },
            _ => ScoringMode::Limited,
        }
    }

    /// Text similarity component.
    ///
    /// Falls back to 0.5 when either embedding is missing or the dimensions
    /// differ.
    pub fn text_similarity(&self, item: Option<&[f32]>, interest: Option<&[f32]>) -> f64 {
        match (item, interest) {
            (Some(a), Some(b)) if !a.is_empty() && a.len() == b.len() => cosine_similarity(a, b),
            _ => DEFAULT_TEXT_SIMILARITY,
        }
    }

    /// Topic component: mean matching affinity over the item's topics,
    /// squashed through the logistic function. Items without topics score 0.
    pub fn topic_score(&self, topics: &[String], profile: &AffinityProfile) -> f64 {
        if topics.is_empty() {
            return 0.0;
        }

        let total: f64 = topics
            .iter()
            .map(|topic| matching_affinity(profile, topic).unwrap_or(0.0))
            .sum();

        sigmoid(total / topics.len() as f64)
    }

    /// Voice modifier: each preference matching any item topic contributes
    /// once, `+0.4 × intensity` for likes and `−0.5 × intensity` for dislikes.
    pub fn voice_modifier(&self, topics: &[String], profile: &AffinityProfile) -> f64 {
        let Some(preferences) = profile.voice_preferences.as_ref() else {
            return 0.0;
        };

        preferences
            .topics
            .iter()
            .filter(|pref| topics.iter().any(|t| topics_match(&pref.topic, t)))
            .map(|pref| match pref.sentiment {
                Sentiment::Like => pref.intensity * VOICE_LIKE_FACTOR,
                Sentiment::Dislike => -pref.intensity * VOICE_DISLIKE_FACTOR,
                Sentiment::Neutral => 0.0,
            })
            .sum()
    }

    /// Computes all components and the final score for an item.
    pub fn breakdown(&self, item: &ContentItem, profile: Option<&AffinityProfile>) -> ScoreBreakdown {
        let mode = self.mode(profile);
        let (profile, weights) = match (mode, profile) {
            (ScoringMode::VoiceComplete, Some(p)) => (p, &self.config.voice_complete),
            (ScoringMode::VoiceIncomplete, Some(p)) => (p, &self.config.voice_incomplete),
            _ => return ScoreBreakdown::limited(),
        };

        ScoreBreakdown::from_components(
            mode,
            self.text_similarity(item.embedding.as_deref(), profile.interest_embedding.as_deref()),
            self.topic_score(&item.topics, profile),
            self.voice_modifier(&item.topics, profile),
            DEFAULT_PROMINENCE,
            weights,
        )
    }

    /// Interest score (0-100) of an item for a profile
    pub fn score(&self, item: &ContentItem, profile: Option<&AffinityProfile>) -> u8 {
        self.breakdown(item, profile).score
    }
}
