//! Merging and summarising voice onboarding preferences
//!
//! An onboarding conversation produces one extraction per user turn. Each
//! extraction is merged into the running [`VoicePreferences`]; when the
//! session ends the result is handed to signal ingestion as a
//! `voice_complete` event.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ContentPreference, Sentiment, TopicPreference, VoicePreferences};

/// Intensity given to a new topic when the extraction has none
pub const DEFAULT_INTENSITY: f64 = 0.7;

/// A topic as reported by the preference extractor; every field but the
/// label is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractedTopic {
    /// Topic label
    pub topic: String,
    /// Sentiment, when the user expressed one
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    /// Strength (0.0-1.0), when the user expressed one
    #[serde(default)]
    pub intensity: Option<f64>,
    /// Liked subtopics
    #[serde(default)]
    pub subtopics: Vec<String>,
    /// Subtopics to avoid
    #[serde(default)]
    pub avoid_subtopics: Vec<String>,
}

/// Format preferences as reported by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractedContent {
    /// Formats asked for
    #[serde(default)]
    pub preferred_formats: Vec<String>,
    /// Formats to avoid
    #[serde(default)]
    pub avoid_formats: Vec<String>,
    /// Length preference, when mentioned
    #[serde(default)]
    pub preferred_length: Option<String>,
}

/// Preferences extracted from a single user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceExtraction {
    /// Topics mentioned in the message
    #[serde(default)]
    pub topics: Vec<ExtractedTopic>,
    /// Format preferences mentioned in the message
    #[serde(default)]
    pub content_preferences: Option<ExtractedContent>,
    /// Extractor's own judgement that the message added nothing
    #[serde(default = "default_nothing_new")]
    pub nothing_new: bool,
}

fn default_nothing_new() -> bool {
    true
}

impl Default for PreferenceExtraction {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            content_preferences: None,
            nothing_new: true,
        }
    }
}

fn push_unique(target: &mut Vec<String>, values: &[String]) {
    for value in values {
        if !target.contains(value) {
            target.push(value.clone());
        }
    }
}

/// Merges an extraction into existing preferences.
///
/// Topics are matched case-insensitively. For a known topic the sentiment is
/// replaced, the intensity averaged with the new one and subtopic lists
/// unioned. Unknown topics are appended. Returns whether anything was merged;
/// an extraction without topics that reports nothing new is ignored.
pub fn merge_preferences(existing: &mut VoicePreferences, extraction: &PreferenceExtraction) -> bool {
    if extraction.topics.is_empty() && extraction.nothing_new {
        return false;
    }

    debug!("Merging {} extracted topics", extraction.topics.len());

    for new_topic in &extraction.topics {
        let label = new_topic.topic.trim();
        if label.is_empty() {
            continue;
        }

        let key = label.to_lowercase();
        match existing
            .topics
            .iter_mut()
            .find(|t| t.topic.to_lowercase() == key)
        {
            Some(current) => {
                if let Some(sentiment) = new_topic.sentiment {
                    current.sentiment = sentiment;
                }
                if let Some(intensity) = new_topic.intensity.filter(|i| *i > 0.0) {
                    current.intensity = (current.intensity + intensity) / 2.0;
                }
                push_unique(&mut current.subtopics, &new_topic.subtopics);
                push_unique(&mut current.avoid_subtopics, &new_topic.avoid_subtopics);
            },
            None => existing.topics.push(TopicPreference {
                topic: label.to_string(),
                sentiment: new_topic.sentiment.unwrap_or_default(),
                intensity: new_topic.intensity.unwrap_or(DEFAULT_INTENSITY).clamp(0.0, 1.0),
                subtopics: new_topic.subtopics.clone(),
                avoid_subtopics: new_topic.avoid_subtopics.clone(),
            }),
        }
    }

    if let Some(new_content) = &extraction.content_preferences {
        let content = existing.content.get_or_insert_with(ContentPreference::default);
        push_unique(&mut content.preferred_formats, &new_content.preferred_formats);
        push_unique(&mut content.avoid_formats, &new_content.avoid_formats);
        if let Some(length) = new_content.preferred_length.as_ref().filter(|l| !l.is_empty()) {
            content.preferred_length = length.clone();
        }
    }

    true
}

/// Human-readable summary used to confirm preferences with the user
pub fn summarize(preferences: &VoicePreferences) -> String {
    if preferences.topics.is_empty() {
        return "I haven't detected any specific preferences yet.".to_string();
    }

    let mut parts = Vec::new();

    let likes: Vec<String> = preferences
        .likes()
        .map(|t| match t.subtopics.as_slice() {
            [] => t.topic.clone(),
            subtopics => {
                let shown: Vec<&str> = subtopics.iter().take(2).map(String::as_str).collect();
                format!("{} (especially {})", t.topic, shown.join(", "))
            },
        })
        .collect();
    if !likes.is_empty() {
        parts.push(format!("You're interested in: {}", likes.join(", ")));
    }

    let dislikes: Vec<&str> = preferences.dislikes().map(|t| t.topic.as_str()).collect();
    if !dislikes.is_empty() {
        parts.push(format!("You'd like to avoid: {}", dislikes.join(", ")));
    }

    if let Some(content) = preferences
        .content
        .as_ref()
        .filter(|c| !c.preferred_formats.is_empty())
    {
        parts.push(format!("You prefer: {}", content.preferred_formats.join(", ")));
    }

    if parts.is_empty() {
        return "I haven't detected any specific preferences yet.".to_string();
    }
    format!("{}.", parts.join(". "))
}
