//! Template-based explanations for item scores
//!
//! Explanations are built from the item's topics, the profile's strongest
//! positive topics and voice preference matches. No model is involved, so the
//! same inputs always produce the same sentence.

use serde::Serialize;

use crate::scoring::topics_match;
use crate::types::{AffinityProfile, ContentItem};

/// Number of top-affinity topics considered
pub const DEFAULT_TOP_N: usize = 3;

/// Sentence used when the item has no topics
pub const GENERIC_EXPLANATION: &str = "Shown based on its prominence on the page.";

/// What an explanation was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationBasis {
    /// Liked topics from voice onboarding
    VoiceLike,
    /// Top topic affinities
    TopicAffinity,
    /// Item topics only
    ItemTopics,
    /// Nothing topical to say
    Generic,
}

/// An explanation and the evidence behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// Sentence shown to the user
    pub text: String,
    /// Which rule produced the sentence
    pub basis: ExplanationBasis,
    /// Item topics that matched the basis
    pub matched_topics: Vec<String>,
    /// Item topics matching a disliked voice preference
    pub disliked_topics: Vec<String>,
}

/// Builds explanation strings
#[derive(Debug, Clone)]
pub struct ExplanationEngine {
    top_n: usize,
}

impl Default for ExplanationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl ExplanationEngine {
    /// Creates an engine considering the `top_n` strongest profile topics
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Short justification for why an item was ranked where it was
    pub fn explain(&self, item: &ContentItem, profile: Option<&AffinityProfile>) -> String {
        self.explain_detailed(item, profile).text
    }

    /// Justification along with the rule and topics it came from
    pub fn explain_detailed(
        &self,
        item: &ContentItem,
        profile: Option<&AffinityProfile>,
    ) -> Explanation {
        let topics: Vec<&str> = item
            .topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();

        if topics.is_empty() {
            return Explanation {
                text: GENERIC_EXPLANATION.to_string(),
                basis: ExplanationBasis::Generic,
                matched_topics: Vec::new(),
                disliked_topics: Vec::new(),
            };
        }

        let voice = profile.and_then(|p| p.voice_preferences.as_ref());

        let liked: Vec<&str> = voice
            .map(|v| v.likes().map(|pref| pref.topic.as_str()).collect())
            .unwrap_or_default();
        let disliked: Vec<&str> = voice
            .map(|v| v.dislikes().map(|pref| pref.topic.as_str()).collect())
            .unwrap_or_default();
        let liked = matching_topics(&topics, &liked);
        let disliked = matching_topics(&topics, &disliked);

        let (basis, matched) = if !liked.is_empty() {
            (ExplanationBasis::VoiceLike, liked)
        } else {
            let top: Vec<String> = profile
                .map(|p| {
                    p.top_topics(self.top_n)
                        .into_iter()
                        .filter(|(_, affinity)| *affinity > 0.0)
                        .map(|(topic, _)| topic)
                        .collect()
                })
                .unwrap_or_default();
            let top: Vec<&str> = top.iter().map(String::as_str).collect();
            let affinity_matches = matching_topics(&topics, &top);

            if affinity_matches.is_empty() {
                let related = topics.iter().take(2).map(|t| t.to_string()).collect();
                (ExplanationBasis::ItemTopics, related)
            } else {
                (ExplanationBasis::TopicAffinity, affinity_matches)
            }
        };

        let mut text = match basis {
            ExplanationBasis::ItemTopics => format!("Related to {}.", matched.join(", ")),
            _ => format!("Matches your interest in {}.", matched.join(", ")),
        };

        // Disliked topics only add a caveat; filtering happens elsewhere.
        if !disliked.is_empty() {
            text.push_str(&format!(
                " Includes {}, which you said you'd rather avoid.",
                disliked.join(", ")
            ));
        }

        Explanation {
            text,
            basis,
            matched_topics: matched,
            disliked_topics: disliked,
        }
    }
}

/// Item topics matching any of `candidates`, in item order, without duplicates
fn matching_topics(item_topics: &[&str], candidates: &[&str]) -> Vec<String> {
    item_topics
        .iter()
        .filter(|topic| candidates.iter().any(|c| topics_match(c, topic)))
        .fold(Vec::new(), |mut acc, topic| {
            if !acc.iter().any(|t: &String| t == topic) {
                acc.push(topic.to_string());
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sentiment, TopicPreference, VoicePreferences};

    fn voice_profile() -> AffinityProfile {
        let mut profile = AffinityProfile::new("u");
        profile.topic_affinity.insert("AI/ML".into(), 0.9);
        profile.topic_affinity.insert("sports".into(), -0.8);
        profile.voice_onboarding_complete = true;
        profile.voice_preferences = Some(VoicePreferences {
            topics: vec![
                TopicPreference::new("AI/ML", Sentiment::Like, 0.9),
                TopicPreference::new("sports", Sentiment::Dislike, 0.8),
            ],
            ..Default::default()
        });
        profile
    }

    #[test]
    fn test_voice_like_takes_priority() {
        let engine = ExplanationEngine::default();
        let item = ContentItem::new("a", "").with_topics(["AI/ML", "startups"]);

        let explanation = engine.explain_detailed(&item, Some(&voice_profile()));
        assert_eq!(explanation.basis, ExplanationBasis::VoiceLike);
        assert_eq!(explanation.text, "Matches your interest in AI/ML.");
    }

    #[test]
    fn test_disliked_topic_gets_caveat_not_like_claim() {
        let engine = ExplanationEngine::default();
        let item = ContentItem::new("b", "").with_topics(["sports"]);

        let text = engine.explain(&item, Some(&voice_profile()));
        assert!(!text.contains("Matches your interest"));
        assert_eq!(
            text,
            "Related to sports. Includes sports, which you said you'd rather avoid."
        );
    }

    #[test]
    fn test_top_affinity_match() {
        let engine = ExplanationEngine::default();
        let mut profile = AffinityProfile::new("u");
        profile.topic_affinity.insert("finance".into(), 0.9);
        profile.topic_affinity.insert("music".into(), 0.1);

        let item = ContentItem::new("c", "").with_topics(["Personal Finance", "travel"]);
        let explanation = engine.explain_detailed(&item, Some(&profile));
        assert_eq!(explanation.basis, ExplanationBasis::TopicAffinity);
        assert_eq!(explanation.text, "Matches your interest in Personal Finance.");
    }

    #[test]
    fn test_only_top_n_topics_used() {
        let engine = ExplanationEngine::new(1);
        let mut profile = AffinityProfile::new("u");
        profile.topic_affinity.insert("finance".into(), 0.9);
        profile.topic_affinity.insert("music".into(), 0.5);

        let item = ContentItem::new("d", "").with_topics(["music"]);
        assert_eq!(engine.explain(&item, Some(&profile)), "Related to music.");
    }

    #[test]
    fn test_related_fallback_uses_first_two_topics() {
        let engine = ExplanationEngine::default();
        let item = ContentItem::new("e", "").with_topics(["space", "science", "climate"]);

        assert_eq!(engine.explain(&item, None), "Related to space, science.");
    }

    #[test]
    fn test_no_topics_is_generic() {
        let engine = ExplanationEngine::default();
        let item = ContentItem::new("f", "text");

        let explanation = engine.explain_detailed(&item, Some(&voice_profile()));
        assert_eq!(explanation.basis, ExplanationBasis::Generic);
        assert_eq!(explanation.text, GENERIC_EXPLANATION);
    }
}
