//! Ordinal normalization and per-product scoring

use crate::domain::attribute::{Attribute, Level};
use crate::domain::product::FeatureRecord;
use crate::domain::requirements::Requirements;

/// Rank of anything outside the vocabulary. Below every real rank, so unknown
/// data can only cost points.
pub const UNKNOWN_RANK: i8 = -1;

/// Highest score a product can reach: one point per ordinal attribute.
pub const MAX_SCORE: u8 = Attribute::ALL.len() as u8;

/// `low → 0`, `medium → 1`, `high → 2`, missing → [`UNKNOWN_RANK`].
pub fn rank(level: Option<Level>) -> i8 {
    match level {
        Some(Level::Low) => 0,
        Some(Level::Medium) => 1,
        Some(Level::High) => 2,
        None => UNKNOWN_RANK,
    }
}

/// Whether a product level meets or exceeds a requirement.
pub fn satisfies(product: Option<Level>, required: Level) -> bool {
    rank(product) >= rank(Some(required))
}

/// Counts the attributes where the product meets or exceeds the requirement.
/// A missing feature record scores as if every attribute were unknown. Budget
/// never contributes.
pub fn score(requirements: &Requirements, features: Option<&FeatureRecord>) -> u8 {
    Attribute::ALL
        .iter()
        .filter(|attribute| {
            let offered = features.and_then(|record| record.get(**attribute));
            satisfies(offered, requirements.level(**attribute))
        })
        .count() as u8
}
