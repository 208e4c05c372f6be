//! Text-to-structured-record extraction.
//!
//! Both extractors keep the collaborator on the far side of the
//! canonicalization boundary: whatever the model replies is run through
//! [`canonicalize`] or [`canonicalize_features`] before anything downstream
//! sees it.

use async_trait::async_trait;
use serde_json::Value;
use shopassist_core::{
    canonicalize, canonicalize_features, ApplicationError, DomainError, FeatureRecord,
    RawRequirements, RequirementPolicy, Requirements,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, LlmClient, ResponseFormat};

/// Key some models wrap a JSON-mode answer in.
const OUTPUT_KEY: &str = "output";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

impl From<ExtractionError> for ApplicationError {
    fn from(value: ExtractionError) -> Self {
        match value {
            ExtractionError::Domain(error) => Self::Domain(error),
            ExtractionError::Collaborator(message) => Self::Integration(message),
        }
    }
}

#[async_trait]
pub trait RequirementExtractor: Send + Sync {
    async fn extract(
        &self,
        assistant_turn: &str,
        policy: &RequirementPolicy,
    ) -> Result<Requirements, ExtractionError>;
}

/// Canonicalizes the assistant's text as-is. Never calls out.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicRequirementExtractor;

#[async_trait]
impl RequirementExtractor for DeterministicRequirementExtractor {
    async fn extract(
        &self,
        assistant_turn: &str,
        policy: &RequirementPolicy,
    ) -> Result<Requirements, ExtractionError> {
        Ok(canonicalize(&RawRequirements::from(assistant_turn), policy)?)
    }
}

/// Tries the deterministic path first and asks the collaborator to restate
/// the dictionary only when that fails for a reason a restatement could fix.
#[derive(Clone, Debug)]
pub struct LlmRequirementExtractor<C> {
    client: C,
}

impl<C> LlmRequirementExtractor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> RequirementExtractor for LlmRequirementExtractor<C>
where
    C: LlmClient,
{
    async fn extract(
        &self,
        assistant_turn: &str,
        policy: &RequirementPolicy,
    ) -> Result<Requirements, ExtractionError> {
        match canonicalize(&RawRequirements::from(assistant_turn), policy) {
            Ok(requirements) => return Ok(requirements),
            Err(error) if error.is_budget_below_floor() => return Err(error.into()),
            Err(error) => {
                debug!(
                    event_name = "agent.extraction.deterministic_miss",
                    reason = %error,
                    "falling back to collaborator extraction"
                );
            }
        }

        let messages = requirement_extraction_messages(assistant_turn);
        let reply = self
            .client
            .complete(&messages, ResponseFormat::Json)
            .await
            .map_err(|error| ExtractionError::Collaborator(format!("{error:#}")))?;

        let raw = raw_from_reply(&reply);
        canonicalize(&raw, policy).map_err(|error| {
            warn!(
                event_name = "agent.extraction.rejected",
                reason = %error,
                "collaborator reply did not canonicalize"
            );
            ExtractionError::Domain(error)
        })
    }
}

#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// `Ok(None)` means the description held nothing classifiable.
    async fn extract_features(
        &self,
        description: &str,
    ) -> Result<Option<FeatureRecord>, ExtractionError>;
}

/// Classifies a free-text product description into a feature record.
#[derive(Clone, Debug)]
pub struct LlmFeatureExtractor<C> {
    client: C,
}

impl<C> LlmFeatureExtractor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> FeatureExtractor for LlmFeatureExtractor<C>
where
    C: LlmClient,
{
    async fn extract_features(
        &self,
        description: &str,
    ) -> Result<Option<FeatureRecord>, ExtractionError> {
        let messages = feature_extraction_messages(description);
        let reply = self
            .client
            .complete(&messages, ResponseFormat::Json)
            .await
            .map_err(|error| ExtractionError::Collaborator(format!("{error:#}")))?;

        let value = match serde_json::from_str::<Value>(&reply) {
            Ok(value) => unwrap_output(value),
            Err(_) => Value::String(reply),
        };
        Ok(canonicalize_features(&value))
    }
}

fn raw_from_reply(reply: &str) -> RawRequirements {
    match serde_json::from_str::<Value>(reply) {
        Ok(value) => RawRequirements::from_json(unwrap_output(value)),
        Err(_) => RawRequirements::from(reply),
    }
}

fn unwrap_output(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key(OUTPUT_KEY) => {
            map.remove(OUTPUT_KEY).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn requirement_extraction_messages(assistant_turn: &str) -> Vec<ChatMessage> {
    let system = "You extract a laptop buyer profile from text. The input may contain a \
        dictionary with the keys 'GPU intensity', 'Display quality', 'Portability', \
        'Multitasking', 'Processing speed' and 'Budget'. Copy the values exactly as they \
        appear in the input. Every key except 'Budget' takes one of 'low', 'medium' or \
        'high'. 'Budget' is a whole number with currency symbols and separators removed. \
        Do not invent a value that the input does not state. Reply with a single JSON \
        object holding those six keys and nothing else.\n\
        Example input: Here is your profile: {'GPU intensity': 'high', 'Display quality': \
        'medium', 'Portability': 'low', 'Multitasking': 'high', 'Processing speed': 'high', \
        'Budget': '70,000 INR'}\n\
        Example output: {\"GPU intensity\": \"high\", \"Display quality\": \"medium\", \
        \"Portability\": \"low\", \"Multitasking\": \"high\", \"Processing speed\": \"high\", \
        \"Budget\": \"70000\"}";
    vec![ChatMessage::system(system), ChatMessage::user(format!("Input: {assistant_turn}"))]
}

fn feature_extraction_messages(description: &str) -> Vec<ChatMessage> {
    let system = "You classify laptop specifications. Read the description and rate each \
        feature as 'low', 'medium' or 'high' using these rules.\n\
        GPU intensity (graphics processor): low for integrated or entry-level graphics such \
        as Intel UHD; medium for mid-range graphics such as Apple M1, AMD Radeon or Intel \
        Iris; high for high-end dedicated graphics such as Nvidia RTX.\n\
        Display quality (panel type, resolution, size): low below Full HD (e.g. 1366x768); \
        medium at Full HD (1920x1080) or above; high for 4K or Retina class panels with \
        strong colour accuracy or HDR.\n\
        Portability (weight): high under 1.51 kg; medium from 1.51 kg to 2.51 kg; low above \
        2.51 kg.\n\
        Multitasking (RAM): low for 8 GB or 12 GB; medium for 16 GB; high for 32 GB or more.\n\
        Processing speed (CPU): low for entry-level chips such as Core i3 or Ryzen 3; medium \
        for Core i5 or Ryzen 5; high for Core i7, Ryzen 7 or above.\n\
        Reply with a single JSON object with exactly the keys 'GPU intensity', 'Display \
        quality', 'Portability', 'Multitasking' and 'Processing speed'.";
    vec![ChatMessage::system(system), ChatMessage::user(format!("Description: {description}"))]
}
