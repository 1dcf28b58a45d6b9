//! Contracts for external collaborators
//!
//! Embedding models, topic classifiers, article extractors and fact-checkers
//! live outside the core. They are injected behind these traits so the core
//! can be exercised with in-process fakes.

use async_trait::async_trait;

use crate::article::ArticleContent;
use crate::authenticity::{AuthenticityRequest, AuthenticityResult};
use crate::errors::Result;

/// Produces text embeddings
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a piece of text into a fixed-dimension vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Assigns topic labels to text
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    /// Returns topic labels for the text, most relevant first
    async fn classify(&self, text: &str) -> Result<Vec<String>>;
}

/// Extracts readable article content from a URL
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetches and extracts the article behind `url`
    async fn extract(&self, url: &str) -> Result<ArticleContent>;
}

/// Fact-checks an article against independent sources
#[async_trait]
pub trait AuthenticityChecker: Send + Sync {
    /// Checks a single article
    async fn check(&self, request: &AuthenticityRequest) -> Result<AuthenticityResult>;
}

/// Advisory taxonomy topic labels
pub const TOPIC_TAXONOMY: &[&str] = &[
    "AI/ML",
    "programming",
    "cloud/infrastructure",
    "cybersecurity",
    "startups",
    "developer tools",
    "open source",
    "mobile apps",
    "finance",
    "business strategy",
    "entrepreneurship",
    "marketing",
    "science",
    "research",
    "space",
    "climate",
    "gaming",
    "movies/TV",
    "music",
    "sports",
    "health",
    "productivity",
    "design",
    "travel",
    "food",
];

/// Topic returned when nothing in the taxonomy matches
pub const FALLBACK_TOPIC: &str = "other";

const KEYWORDS: &[(&str, &[&str])] = &[
    ("AI/ML", &["ai", "machine learning", "neural", "llm", "gpt", "deep learning", "model training"]),
    ("programming", &["rust", "python", "javascript", "code", "compiler", "programming", "api"]),
    ("cloud/infrastructure", &["cloud", "kubernetes", "aws", "docker", "serverless", "datacenter"]),
    ("cybersecurity", &["security", "vulnerability", "breach", "malware", "ransomware", "exploit"]),
    ("startups", &["startup", "seed round", "series a", "founder", "y combinator"]),
    ("developer tools", &["ide", "debugger", "github", "devtools", "cli"]),
    ("open source", &["open source", "open-source", "license", "maintainer"]),
    ("mobile apps", &["ios", "android", "iphone", "mobile app", "app store"]),
    ("finance", &["stock", "market", "bank", "finance", "investor", "interest rate", "crypto", "bitcoin"]),
    ("business strategy", &["strategy", "acquisition", "merger", "revenue", "ceo"]),
    ("entrepreneurship", &["entrepreneur", "bootstrap", "small business"]),
    ("marketing", &["marketing", "advertising", "brand", "seo", "campaign"]),
    ("science", &["science", "physics", "chemistry", "biology", "scientist"]),
    ("research", &["research", "study", "paper", "peer-reviewed", "researchers"]),
    ("space", &["nasa", "spacex", "rocket", "orbit", "astronaut", "mars", "telescope"]),
    ("climate", &["climate", "emissions", "carbon", "global warming", "renewable"]),
    ("gaming", &["game", "gaming", "playstation", "xbox", "nintendo", "esports"]),
    ("movies/TV", &["movie", "film", "tv", "series", "netflix", "box office"]),
    ("music", &["music", "album", "song", "concert", "band"]),
    ("sports", &["sports", "football", "soccer", "nba", "nfl", "tennis", "olympics", "match"]),
    ("health", &["health", "medical", "disease", "vaccine", "fitness", "hospital"]),
    ("productivity", &["productivity", "workflow", "habit", "focus", "time management"]),
    ("design", &["design", "ui", "ux", "typography", "figma"]),
    ("travel", &["travel", "flight", "airline", "hotel", "tourism", "vacation"]),
    ("food", &["food", "recipe", "restaurant", "cooking", "chef"]),
];

/// Deterministic classifier over [`TOPIC_TAXONOMY`]
///
/// Matches whole words (or word sequences) of the lower-cased text against a
/// fixed keyword list. Topics are ordered by number of keyword hits.
#[derive(Debug, Clone)]
pub struct KeywordTopicClassifier {
    max_topics: usize,
}

impl Default for KeywordTopicClassifier {
    fn default() -> Self {
        Self { max_topics: 3 }
    }
}

impl KeywordTopicClassifier {
    /// Creates a classifier returning at most `max_topics` labels
    pub fn new(max_topics: usize) -> Self {
        Self {
            max_topics: max_topics.max(1),
        }
    }

    /// Classifies text synchronously
    pub fn classify_text(&self, text: &str) -> Vec<String> {
        let words: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        let normalized = format!(" {} ", words.join(" "));

        let mut hits: Vec<(usize, &str)> = KEYWORDS
            .iter()
            .filter_map(|(topic, keywords)| {
                let count = keywords
                    .iter()
                    .filter(|k| normalized.contains(&format!(" {k} ")))
                    .count();
                (count > 0).then_some((count, *topic))
            })
            .collect();

        if hits.is_empty() {
            return vec![FALLBACK_TOPIC.to_string()];
        }

        // Stable sort keeps taxonomy order among equal hit counts.
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        hits.into_iter()
            .take(self.max_topics)
            .map(|(_, topic)| topic.to_string())
            .collect()
    }
}

#[async_trait]
impl TopicClassifier for KeywordTopicClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.classify_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_topic_is_in_taxonomy() {
        for (topic, _) in KEYWORDS {
            assert!(TOPIC_TAXONOMY.contains(topic), "{topic} not in taxonomy");
        }
    }

    #[test]
    fn test_classify_ranks_by_hits() {
        let classifier = KeywordTopicClassifier::default();
        let topics =
            classifier.classify_text("New LLM beats GPT on deep learning benchmark, says stock market");

        assert_eq!(topics[0], "AI/ML");
        assert!(topics.contains(&"finance".to_string()));
    }

    #[test]
    fn test_whole_word_matching() {
        let classifier = KeywordTopicClassifier::default();
        // "maintain" must not match "ai", "said" must not match "ai"
        assert_eq!(classifier.classify_text("He said to maintain it"), vec!["other"]);
    }

    #[test]
    fn test_max_topics() {
        let classifier = KeywordTopicClassifier::new(1);
        let topics = classifier.classify_text("NASA rocket launch delayed by NFL match and album");
        assert_eq!(topics, vec!["space"]);
    }

    #[tokio::test]
    async fn test_trait_impl() {
        let classifier = KeywordTopicClassifier::default();
        let topics = classifier.classify("Recipe from a famous chef").await.unwrap();
        assert_eq!(topics, vec!["food"]);
    }
}
