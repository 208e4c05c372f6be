//! Agent Runtime - language-model collaborators around the ShopAssist core
//!
//! This crate holds everything that talks to a model or suspends:
//! - Extracts a requirements dictionary from the assistant's turn
//! - Classifies catalog descriptions into feature records, once, ahead of matching
//! - Retries collaborator calls with capped exponential backoff
//! - Hands accepted recommendations to the conversational layer
//!
//! # Flow
//!
//! 1. **Intent check** (`conversation`) - does the turn hold a dictionary yet?
//! 2. **Extraction** (`extraction`) - deterministic canonicalization, model fallback
//! 3. **Matching** - `shopassist_core::Recommender` against a catalog snapshot
//! 4. **Presentation** (`presentation`) - seed messages or a fixed reply
//!
//! # Safety Principle
//!
//! The model is strictly a translator. Scores, budget checks and acceptance
//! are decided by the core on canonical records only.

pub mod conversation;
pub mod extraction;
pub mod llm;
pub mod prepare;
pub mod presentation;
pub mod retry;

pub use conversation::{intent_confirmed, RecommendationSession, SessionOutcome};
pub use extraction::{
    DeterministicRequirementExtractor, ExtractionError, FeatureExtractor, LlmFeatureExtractor,
    LlmRequirementExtractor, RequirementExtractor,
};
pub use llm::{ChatMessage, LlmClient, OpenAiCompatibleClient, ResponseFormat, Role};
pub use prepare::{CatalogPreparer, PreparationReport};
pub use retry::{RetryPolicy, RetryingClient};
