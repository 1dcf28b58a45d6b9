//! Signal ingestion
//!
//! Translates one interaction event into a mutation of an
//! [`AffinityProfile`]. Every rule here is additive and order-sensitive:
//! replaying an event applies it again. Deduplication belongs to the
//! transport, not to this module.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{AffinityProfile, VoicePreferences};

/// Affinity delta for a click
pub const CLICK_DELTA: f64 = 0.3;
/// Affinity delta for an explicit thumbs up
pub const THUMBS_UP_DELTA: f64 = 0.5;
/// Affinity delta for an explicit thumbs down
pub const THUMBS_DOWN_DELTA: f64 = -0.3;
/// Affinity delta for dwelling on an item
pub const DWELL_DELTA: f64 = 0.1;

/// History weight of the interest-embedding moving average
pub const EMA_ALPHA: f64 = 0.85;

/// Ceiling of time-based affinity
pub const MAX_ACTIVITY_AFFINITY: f64 = 2.0;
/// Affinity gained per minute of activity, before diminishing returns
pub const ACTIVITY_WEIGHT_PER_MINUTE: f64 = 0.1;
/// Largest increment a single activity event can contribute
pub const MAX_ACTIVITY_INCREMENT: f64 = 0.5;

/// Share of a parent topic's weight given to its subtopics
pub const SUBTOPIC_FACTOR: f64 = 0.8;
/// Share of a parent topic's |weight| subtracted from avoided subtopics
pub const AVOID_SUBTOPIC_FACTOR: f64 = 0.5;

/// Kind of interaction event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The user opened an item
    Click,
    /// Explicit positive feedback
    ThumbsUp,
    /// Explicit negative feedback
    ThumbsDown,
    /// The user lingered on an item
    Dwell,
    /// Time spent on a page of some categories
    PageVisit,
    /// Voice onboarding finished with a set of preferences
    VoiceComplete,
    /// Anything else; only counted
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Whether the event carries a positive engagement signal that should
    /// pull the interest embedding towards the item
    pub fn is_positive_engagement(self) -> bool {
        matches!(self, EventKind::Click | EventKind::ThumbsUp | EventKind::Dwell)
    }

    /// Fixed per-topic delta for discrete feedback events
    pub fn topic_delta(self) -> Option<f64> {
        match self {
            EventKind::Click => Some(CLICK_DELTA),
            EventKind::ThumbsUp => Some(THUMBS_UP_DELTA),
            EventKind::ThumbsDown => Some(THUMBS_DOWN_DELTA),
            EventKind::Dwell => Some(DWELL_DELTA),
            EventKind::PageVisit | EventKind::VoiceComplete | EventKind::Unknown => None,
        }
    }
}

/// One interaction event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    /// Event type
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Topics of the item or page the event refers to
    #[serde(default)]
    pub topics: Vec<String>,
    /// Embedding of the item, if known
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Domain of the page, for page visits
    #[serde(default)]
    pub domain: Option<String>,
    /// Time spent, for page visits and dwell
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Final preferences, for voice completion
    #[serde(default)]
    pub voice_preferences: Option<VoicePreferences>,
}

impl SignalEvent {
    /// Creates an event with only a kind and topics
    pub fn new<I, S>(kind: EventKind, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            topics: topics.into_iter().map(Into::into).collect(),
            embedding: None,
            domain: None,
            duration_ms: None,
            voice_preferences: None,
        }
    }

    /// Builder-style embedding setter
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Creates a page-visit event
    pub fn page_visit<I, S>(topics: I, domain: Option<String>, duration_ms: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain,
            duration_ms: Some(duration_ms),
            ..Self::new(EventKind::PageVisit, topics)
        }
    }

    /// Creates a voice-completion event
    pub fn voice_complete(preferences: VoicePreferences) -> Self {
        Self {
            voice_preferences: Some(preferences),
            ..Self::new(EventKind::VoiceComplete, Vec::<String>::new())
        }
    }
}

/// What an ingestion changed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngestReport {
    /// Topic keys whose affinity was written
    pub topics_updated: Vec<String>,
    /// Whether the interest embedding changed
    pub embedding_updated: bool,
    /// Whether a domain affinity changed
    pub domain_updated: bool,
}

/// Applies one event to a profile in place.
///
/// Never fails: unknown kinds and missing fields only bump
/// `interaction_count`.
pub fn ingest(profile: &mut AffinityProfile, event: &SignalEvent) -> IngestReport {
    let mut report = IngestReport::default();

    match event.kind {
        EventKind::Click | EventKind::ThumbsUp | EventKind::ThumbsDown | EventKind::Dwell => {
            let delta = event.kind.topic_delta().unwrap_or(0.0);
            for topic in &event.topics {
                *profile.topic_affinity.entry(topic.clone()).or_insert(0.0) += delta;
                report.topics_updated.push(topic.clone());
            }

            if event.kind.is_positive_engagement() {
                if let Some(embedding) = event.embedding.as_deref() {
                    report.embedding_updated = blend_interest_embedding(profile, embedding);
                }
            }
        },
        EventKind::PageVisit => {
            let minutes = event.duration_ms.unwrap_or(0) as f64 / 60_000.0;
            for topic in &event.topics {
                let topic = topic.trim().to_lowercase();
                if topic.is_empty() {
                    continue;
                }
                let current = profile.topic_affinity.get(&topic).copied().unwrap_or(0.0);
                profile
                    .topic_affinity
                    .insert(topic.clone(), activity_affinity(current, minutes));
                report.topics_updated.push(topic);
            }

            if let Some(domain) = event.domain.as_deref().filter(|d| !d.is_empty()) {
                *profile
                    .domain_affinity
                    .entry(domain.to_string())
                    .or_insert(0.0) += minutes;
                report.domain_updated = true;
            }
        },
        EventKind::VoiceComplete => match &event.voice_preferences {
            Some(preferences) => {
                report.topics_updated = apply_voice_preferences(profile, preferences.clone());
            },
            None => warn!(
                "voice_complete event for {} carried no preferences",
                profile.user_id
            ),
        },
        EventKind::Unknown => {
            debug!("Ignoring unknown event type for {}", profile.user_id);
        },
    }

    profile.interaction_count += 1;
    report
}

/// Time-based affinity update with diminishing returns.
///
/// The increment is `min(0.5, minutes × 0.1)`, scaled by how far `current`
/// still is from the 2.0 ceiling, and the result is clamped to [0, 2.0].
/// For `current` in [0, 2.0) the result stays strictly below 2.0 and grows
/// monotonically with `minutes`.
pub fn activity_affinity(current: f64, minutes: f64) -> f64 {
    let increment = (minutes.max(0.0) * ACTIVITY_WEIGHT_PER_MINUTE).min(MAX_ACTIVITY_INCREMENT);
    let updated = current + increment * (1.0 - current / MAX_ACTIVITY_AFFINITY);
    updated.clamp(0.0, MAX_ACTIVITY_AFFINITY)
}

/// Exponential moving average of two vectors, per coordinate.
///
/// Written as `old + (1 − α)(new − old)`, which equals
/// `α·old + (1 − α)·new` and returns `old` bit-for-bit when `new == old`.
pub fn ema_blend(old: &[f32], new: &[f32], alpha: f64) -> Vec<f32> {
    old.iter()
        .zip(new)
        .map(|(&o, &n)| {
            let o = f64::from(o);
            (o + (1.0 - alpha) * (f64::from(n) - o)) as f32
        })
        .collect()
}

/// Pulls the profile's interest embedding towards `embedding`.
///
/// The first embedding is adopted verbatim. A vector of a different
/// dimension is ignored rather than truncating history.
fn blend_interest_embedding(profile: &mut AffinityProfile, embedding: &[f32]) -> bool {
    if embedding.is_empty() {
        return false;
    }

    match profile.interest_embedding.as_mut() {
        Some(current) if !current.is_empty() => {
            if current.len() != embedding.len() {
                warn!(
                    "Embedding dimension mismatch for {}: profile {}, event {}",
                    profile.user_id,
                    current.len(),
                    embedding.len()
                );
                return false;
            }
            *current = ema_blend(current, embedding, EMA_ALPHA);
        },
        _ => profile.interest_embedding = Some(embedding.to_vec()),
    }
    true
}

/// Writes voice onboarding results into the profile.
///
/// Each topic's affinity is set to its resolved weight; subtopics get 0.8×
/// that weight and avoided subtopics −0.5×|weight|. Returns the topic keys
/// written.
pub fn apply_voice_preferences(
    profile: &mut AffinityProfile,
    preferences: VoicePreferences,
) -> Vec<String> {
    let mut written = Vec::new();

    for pref in &preferences.topics {
        let weight = pref.resolved_weight();
        profile.topic_affinity.insert(pref.topic.clone(), weight);
        written.push(pref.topic.clone());

        for subtopic in &pref.subtopics {
            profile
                .topic_affinity
                .insert(subtopic.clone(), weight * SUBTOPIC_FACTOR);
            written.push(subtopic.clone());
        }
        for avoid in &pref.avoid_subtopics {
            profile
                .topic_affinity
                .insert(avoid.clone(), -weight.abs() * AVOID_SUBTOPIC_FACTOR);
            written.push(avoid.clone());
        }
    }

    profile.voice_preferences = Some(preferences);
    profile.voice_onboarding_complete = true;
    written
}

/// Forgets voice onboarding so the user can redo it.
///
/// Affinities learned from clicks and visits are kept.
pub fn clear_voice_preferences(profile: &mut AffinityProfile) {
    profile.voice_preferences = None;
    profile.voice_onboarding_complete = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sentiment, TopicPreference};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_three_clicks_accumulate() {
        let mut profile = AffinityProfile::new("u");
        let click = SignalEvent::new(EventKind::Click, ["finance"]);

        for _ in 0..3 {
            ingest(&mut profile, &click);
        }

        assert!(approx(profile.topic_affinity["finance"], 0.9));
        assert_eq!(profile.interaction_count, 3);
    }

    #[test]
    fn test_event_deltas() {
        let mut profile = AffinityProfile::new("u");
        ingest(&mut profile, &SignalEvent::new(EventKind::ThumbsUp, ["a"]));
        ingest(&mut profile, &SignalEvent::new(EventKind::ThumbsDown, ["b"]));
        ingest(&mut profile, &SignalEvent::new(EventKind::Dwell, ["c"]));

        assert!(approx(profile.topic_affinity["a"], 0.5));
        assert!(approx(profile.topic_affinity["b"], -0.3));
        assert!(approx(profile.topic_affinity["c"], 0.1));
    }

    #[test]
    fn test_unknown_event_only_counts() {
        let mut profile = AffinityProfile::new("u");
        let event: SignalEvent =
            serde_json::from_str(r#"{"type":"share","topics":["music"]}"#).unwrap();
        assert_eq!(event.kind, EventKind::Unknown);

        let report = ingest(&mut profile, &event);
        assert!(report.topics_updated.is_empty());
        assert!(profile.topic_affinity.is_empty());
        assert_eq!(profile.interaction_count, 1);
    }

    #[test]
    fn test_first_embedding_adopted_then_blended() {
        let mut profile = AffinityProfile::new("u");
        ingest(
            &mut profile,
            &SignalEvent::new(EventKind::Click, ["x"]).with_embedding(vec![1.0, 0.0]),
        );
        assert_eq!(profile.interest_embedding, Some(vec![1.0, 0.0]));

        ingest(
            &mut profile,
            &SignalEvent::new(EventKind::Click, ["x"]).with_embedding(vec![0.0, 1.0]),
        );
        let embedding = profile.interest_embedding.clone().unwrap();
        assert!((embedding[0] - 0.85).abs() < 1e-6);
        assert!((embedding[1] - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_thumbs_down_does_not_move_embedding() {
        let mut profile = AffinityProfile::new("u");
        let report = ingest(
            &mut profile,
            &SignalEvent::new(EventKind::ThumbsDown, ["x"]).with_embedding(vec![1.0, 0.0]),
        );
        assert!(!report.embedding_updated);
        assert!(profile.interest_embedding.is_none());
    }

    #[test]
    fn test_dimension_mismatch_keeps_history() {
        let mut profile = AffinityProfile::new("u");
        profile.interest_embedding = Some(vec![0.5, 0.5, 0.5]);

        let report = ingest(
            &mut profile,
            &SignalEvent::new(EventKind::Dwell, ["x"]).with_embedding(vec![1.0, 0.0]),
        );
        assert!(!report.embedding_updated);
        assert_eq!(profile.interest_embedding, Some(vec![0.5, 0.5, 0.5]));
    }

    #[test]
    fn test_ema_is_exact_for_identical_input() {
        let old = vec![0.1_f32, -0.37, 12.5, 1e-7, 0.0];
        assert_eq!(ema_blend(&old, &old, EMA_ALPHA), old);
    }

    #[test]
    fn test_activity_affinity_monotone_and_bounded() {
        for current in [0.0, 0.5, 1.0, 1.5, 1.99] {
            let mut previous = activity_affinity(current, 0.0);
            assert!(approx(previous, current));
            for minutes in [0.5, 1.0, 2.0, 5.0, 10.0, 60.0, 600.0] {
                let next = activity_affinity(current, minutes);
                assert!(next >= previous);
                assert!(next < MAX_ACTIVITY_AFFINITY);
                previous = next;
            }
        }
    }

    #[test]
    fn test_activity_affinity_values() {
        // 3 minutes from zero: 0.3 × (1 − 0) = 0.3
        assert!(approx(activity_affinity(0.0, 3.0), 0.3));
        // capped increment: 0.5 × (1 − 1.0/2.0) = 0.25
        assert!(approx(activity_affinity(1.0, 30.0), 1.25));
        // negative affinity is clamped up to zero
        assert_eq!(activity_affinity(-1.0, 0.0), 0.0);
    }

    #[test]
    fn test_page_visit_updates_topics_and_domain() {
        let mut profile = AffinityProfile::new("u");
        let event =
            SignalEvent::page_visit(["  Science ", ""], Some("nature.com".to_string()), 120_000);

        let report = ingest(&mut profile, &event);

        assert_eq!(report.topics_updated, vec!["science"]);
        assert!(approx(profile.topic_affinity["science"], 0.2));
        assert!(approx(profile.domain_affinity["nature.com"], 2.0));
        assert!(profile.interest_embedding.is_none());
    }

    #[test]
    fn test_voice_complete_fans_out_subtopics() {
        let mut profile = AffinityProfile::new("u");
        profile.topic_affinity.insert("AI/ML".into(), 1.7);

        let mut ai = TopicPreference::new("AI/ML", Sentiment::Like, 0.9);
        ai.subtopics = vec!["LLMs".into()];
        ai.avoid_subtopics = vec!["crypto AI".into()];
        let mut sports = TopicPreference::new("sports", Sentiment::Dislike, 0.8);
        sports.subtopics = vec!["football".into()];

        let preferences = VoicePreferences {
            topics: vec![ai, sports, TopicPreference::new("music", Sentiment::Neutral, 0.5)],
            ..Default::default()
        };

        ingest(&mut profile, &SignalEvent::voice_complete(preferences.clone()));

        assert!(approx(profile.topic_affinity["AI/ML"], 0.9));
        assert!(approx(profile.topic_affinity["LLMs"], 0.72));
        assert!(approx(profile.topic_affinity["crypto AI"], -0.45));
        assert!(approx(profile.topic_affinity["sports"], -0.8));
        assert!(approx(profile.topic_affinity["football"], -0.64));
        assert!(approx(profile.topic_affinity["music"], 0.0));
        assert!(profile.voice_onboarding_complete);
        assert_eq!(profile.voice_preferences, Some(preferences));
        assert_eq!(profile.interaction_count, 1);
    }

    #[test]
    fn test_clear_voice_preferences_keeps_affinities() {
        let mut profile = AffinityProfile::new("u");
        apply_voice_preferences(
            &mut profile,
            VoicePreferences {
                topics: vec![TopicPreference::new("music", Sentiment::Like, 0.6)],
                ..Default::default()
            },
        );

        clear_voice_preferences(&mut profile);

        assert!(!profile.voice_onboarding_complete);
        assert!(profile.voice_preferences.is_none());
        assert!(approx(profile.topic_affinity["music"], 0.6));
    }

    #[test]
    fn test_event_json_shape() {
        let event: SignalEvent = serde_json::from_str(
            r#"{"type":"thumbs_up","topics":["AI/ML"],"embedding":[0.5,0.25]}"#,
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::ThumbsUp);
        assert_eq!(event.embedding, Some(vec![0.5, 0.25]));
    }
}
