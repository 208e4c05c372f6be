use super::types::ScoredCandidate;
use super::DEFAULT_ACCEPTANCE_THRESHOLD;

/// Final acceptance filter over ranked candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecommendationValidator {
    acceptance_threshold: u8,
}

impl Default for RecommendationValidator {
    fn default() -> Self {
        Self { acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD }
    }
}

impl RecommendationValidator {
    pub fn new(acceptance_threshold: u8) -> Self {
        Self { acceptance_threshold }
    }

    pub fn acceptance_threshold(&self) -> u8 {
        self.acceptance_threshold
    }

    /// Keeps candidates scoring strictly above the threshold, in input order.
    /// An empty result means nothing matched and is not an error.
    pub fn validate(&self, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        candidates
            .into_iter()
            .filter(|candidate| candidate.score > self.acceptance_threshold)
            .collect()
    }
}
