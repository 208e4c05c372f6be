//! Deterministic core of the ShopAssist laptop recommender.
//!
//! Turns loosely shaped requirement text into a typed [`Requirements`] record,
//! matches it against a [`CatalogSnapshot`], and returns the accepted
//! recommendations. Nothing here performs network I/O or suspends; the
//! language-model collaborators live in `shopassist-agent`.

pub mod canonical;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod matching;

pub use canonical::{canonicalize, canonicalize_features, RawRequirements, RequirementPolicy};
pub use catalog::{CatalogError, CatalogSnapshot, CatalogStore};
pub use domain::attribute::{Attribute, Level};
pub use domain::product::{FeatureRecord, Product, ProductId};
pub use domain::requirements::Requirements;
pub use errors::{ApplicationError, BudgetIssue, DomainError, InterfaceError};
pub use matching::{MatchingEngine, RecommendationValidator, Recommender, ScoredCandidate};
