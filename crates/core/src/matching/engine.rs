//! Budget filter, scoring and top-K selection

use tracing::{debug, warn};

use super::scoring::score;
use super::types::ScoredCandidate;
use super::DEFAULT_MAX_CANDIDATES;
use crate::domain::product::Product;
use crate::domain::requirements::Requirements;

/// Deterministic matching engine.
///
/// Holds no catalog state; every call works on the snapshot it is given, so
/// one engine can serve any number of concurrent sessions.
#[derive(Clone, Debug)]
pub struct MatchingEngine {
    max_candidates: usize,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self { max_candidates: DEFAULT_MAX_CANDIDATES }
    }

    /// Create with a custom result size. Zero is raised to one.
    pub fn with_max_candidates(max_candidates: usize) -> Self {
        Self { max_candidates: max_candidates.max(1) }
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Scores every in-budget product and returns the best few.
    ///
    /// Products priced above `requirements.budget`, or whose price could not
    /// be normalized, are skipped. Ties keep catalog order because the sort is
    /// stable.
    pub fn match_products(
        &self,
        requirements: &Requirements,
        catalog: &[Product],
    ) -> Vec<ScoredCandidate> {
        let mut candidates: Vec<ScoredCandidate> = catalog
            .iter()
            .filter(|product| within_budget(product, requirements.budget))
            .map(|product| ScoredCandidate {
                product: product.clone(),
                score: score(requirements, product.features.as_ref()),
            })
            .collect();

        let in_budget = candidates.len();
        candidates.sort_by(|left, right| right.score.cmp(&left.score));
        candidates.truncate(self.max_candidates);

        debug!(
            event_name = "core.matching.completed",
            catalog_size = catalog.len(),
            in_budget,
            returned = candidates.len(),
            budget = requirements.budget,
            "matched catalog against requirements"
        );

        candidates
    }
}

fn within_budget(product: &Product, budget: u64) -> bool {
    match product.price {
        Some(price) => price <= budget,
        None => {
            warn!(
                event_name = "core.matching.unpriced_product_skipped",
                product_id = %product.id.0,
                "skipping product without a usable price"
            );
            false
        }
    }
}
