use std::cmp::Ordering;
use std::sync::Arc;

use studyrag_core::config::RetrievalProfiles;
use studyrag_core::types::{Intent, RawHit, ScoredHit, UserId};
use tracing::debug;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Score added per step of priority; the first of `L` listed types gets `L` steps.
pub const BOOST_STEP: f32 = 0.1;

/// Turns raw search hits into an access-controlled, intent-ranked selection.
pub struct RetrievalScorer {
    profiles: Arc<RetrievalProfiles>,
    threshold: f32,
}

impl RetrievalScorer {
    pub fn new(profiles: Arc<RetrievalProfiles>, threshold: f32) -> Self {
        Self { profiles, threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn profiles(&self) -> &RetrievalProfiles {
        &self.profiles
    }

    /// Access filter, boost, threshold (on the boosted score), stable sort, cap.
    ///
    /// Hits the requester may not see are dropped before anything else and
    /// never surface as an error.
    pub fn score(&self, raw_hits: Vec<RawHit>, intent: Intent, requesting_user: UserId, limit: usize) -> Vec<ScoredHit> {
        let priorities = self.profiles.priorities(intent);
        let candidates = raw_hits.len();

        let mut scored: Vec<ScoredHit> = raw_hits
            .into_iter()
            .filter(|hit| hit.metadata.is_visible_to(requesting_user))
            .map(|hit| {
                let score = hit.similarity + priority_boost(priorities, &hit.metadata.document_type);
                ScoredHit { hit, score }
            })
            .filter(|s| s.score >= self.threshold)
            .collect();

        // sort_by is stable: equal scores keep search order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);

        for s in &scored {
            debug!(
                document_type = s.document_type(),
                similarity = s.similarity(),
                boost = s.boost(),
                "kept hit"
            );
        }

        debug!(
            intent = %intent,
            candidates,
            kept = scored.len(),
            threshold = self.threshold,
            "scored retrieval candidates"
        );
        scored
    }
}

pub fn priority_boost(priorities: &[String], document_type: &str) -> f32 {
    priorities
        .iter()
        .position(|t| t == document_type)
        .map(|i| (priorities.len() - i) as f32 * BOOST_STEP)
        .unwrap_or(0.0)
}
