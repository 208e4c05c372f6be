//! Types exchanged between the matching stages and the presentation layer

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::domain::product::Product;

/// Output key carrying the normalized price.
pub const PRICE_KEY: &str = "Price";
/// Output key carrying the match score.
pub const SCORE_KEY: &str = "Score";

/// A product annotated with its match score for one request.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredCandidate {
    pub product: Product,
    /// Number of ordinal attributes met, `0..=5`.
    pub score: u8,
}

/// Serializes as one flat record: every display attribute, the integer
/// `Price` and the `Score`. The feature record used for scoring is left out.
impl Serialize for ScoredCandidate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let attributes = self
            .product
            .attributes
            .iter()
            .filter(|(key, _)| key.as_str() != PRICE_KEY && key.as_str() != SCORE_KEY);

        let mut map = serializer.serialize_map(None)?;
        for (key, value) in attributes {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(PRICE_KEY, &self.product.price)?;
        map.serialize_entry(SCORE_KEY, &self.score)?;
        map.end()
    }
}
