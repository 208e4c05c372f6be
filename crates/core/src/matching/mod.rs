//! Requirement-to-recommendation matching
//!
//! Filters a catalog snapshot by budget, scores every survivor against the
//! requirements on the ordinal scale, keeps the top few and applies the
//! acceptance threshold.

mod engine;
pub mod scoring;
mod types;
mod validator;

pub use engine::MatchingEngine;
pub use scoring::{rank, score, MAX_SCORE, UNKNOWN_RANK};
pub use types::{ScoredCandidate, PRICE_KEY, SCORE_KEY};
pub use validator::RecommendationValidator;

use crate::domain::product::Product;
use crate::domain::requirements::Requirements;

/// Candidates must score strictly above this to be recommended.
pub const DEFAULT_ACCEPTANCE_THRESHOLD: u8 = 2;

/// Maximum candidates kept after ranking.
pub const DEFAULT_MAX_CANDIDATES: usize = 3;

/// Matching engine and validator wired with one set of limits.
#[derive(Clone, Debug, Default)]
pub struct Recommender {
    engine: MatchingEngine,
    validator: RecommendationValidator,
}

impl Recommender {
    pub fn new(engine: MatchingEngine, validator: RecommendationValidator) -> Self {
        Self { engine, validator }
    }

    pub fn with_limits(max_candidates: usize, acceptance_threshold: u8) -> Self {
        Self::new(
            MatchingEngine::with_max_candidates(max_candidates),
            RecommendationValidator::new(acceptance_threshold),
        )
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn validator(&self) -> &RecommendationValidator {
        &self.validator
    }

    /// Runs match then validate. May return an empty set.
    pub fn recommend(
        &self,
        requirements: &Requirements,
        catalog: &[Product],
    ) -> Vec<ScoredCandidate> {
        self.validator.validate(self.engine.match_products(requirements, catalog))
    }
}
