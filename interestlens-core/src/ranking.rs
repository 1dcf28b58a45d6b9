//! Ranking of enriched page items

use tracing::debug;

use crate::explain::ExplanationEngine;
use crate::scoring::ScoringEngine;
use crate::types::{AffinityProfile, ContentItem, ScoredItem};

/// Number of items returned by default
pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// Scores, explains and orders items for a profile
#[derive(Debug, Clone)]
pub struct Ranker {
    scoring: ScoringEngine,
    explanations: ExplanationEngine,
    limit: usize,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(
            ScoringEngine::default(),
            ExplanationEngine::default(),
            DEFAULT_RESULT_LIMIT,
        )
    }
}

impl Ranker {
    /// Creates a ranker returning at most `limit` items
    pub fn new(scoring: ScoringEngine, explanations: ExplanationEngine, limit: usize) -> Self {
        Self {
            scoring,
            explanations,
            limit,
        }
    }

    /// The scoring engine in use
    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// Scores every item and returns the best ones, highest score first.
    ///
    /// Items with equal scores keep their page order.
    pub fn rank(&self, items: &[ContentItem], profile: Option<&AffinityProfile>) -> Vec<ScoredItem> {
        let mut scored: Vec<ScoredItem> = items
            .iter()
            .map(|item| ScoredItem {
                id: item.id.clone(),
                score: self.scoring.score(item, profile),
                topics: item.topics.clone(),
                why: self.explanations.explain(item, profile),
                authenticity_score: None,
                authenticity_status: None,
                authenticity_explanation: None,
            })
            .collect();

        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(self.limit);

        debug!(
            "Ranked {} items, returning {} (profile: {})",
            items.len(),
            scored.len(),
            profile.map(|p| p.user_id.as_str()).unwrap_or("anonymous")
        );

        scored
    }
}
