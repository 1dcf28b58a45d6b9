use chrono::{DateTime, Utc};
use interestlens_core::{
    AffinityProfile, ProfileSummary, ScoredItem, ScoringMode, TrackSummary, VoicePreferences,
    VoiceSession, summarize,
};
use serde::{Deserialize, Serialize};

/// Number of topics included in profile summaries
pub const SUMMARY_TOPICS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub items: Vec<ScoredItem>,
    pub mode: ScoringMode,
    pub profile_summary: ProfileSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub persisted: bool,
    pub interaction_count: u64,
    pub topics_updated: Vec<String>,
    pub embedding_updated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: AffinityProfile,
    pub summary: ProfileSummary,
}

impl From<AffinityProfile> for ProfileResponse {
    fn from(profile: AffinityProfile) -> Self {
        Self {
            summary: ProfileSummary::from_profile(&profile, SUMMARY_TOPICS),
            profile,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackResponse {
    #[serde(flatten)]
    pub summary: TrackSummary,
    pub topics_updated: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub preferences: Option<VoicePreferences>,
    pub onboarding_complete: bool,
    pub summary: String,
}

impl PreferencesResponse {
    pub fn from_profile(profile: &AffinityProfile) -> Self {
        Self {
            preferences: profile.voice_preferences.clone(),
            onboarding_complete: profile.voice_onboarding_complete,
            summary: profile
                .voice_preferences
                .as_ref()
                .map(summarize)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: VoiceSession,
    pub summary: String,
}

impl From<VoiceSession> for SessionResponse {
    fn from(session: VoiceSession) -> Self {
        Self {
            summary: summarize(&session.preferences),
            session,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEndResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub profile_summary: ProfileSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
