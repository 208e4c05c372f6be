//! Canonicalization boundary for untrusted requirement and feature input.
//!
//! Everything upstream of this module (assistant replies, collaborator JSON,
//! persisted catalog text) is loosely shaped. Everything downstream works on
//! [`Requirements`] and [`FeatureRecord`].

pub mod budget;
pub mod fragment;

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::domain::attribute::{Attribute, Level, BUDGET_KEY};
use crate::domain::product::FeatureRecord;
use crate::domain::requirements::Requirements;
use crate::errors::{BudgetIssue, DomainError};

/// Smallest budget the catalog is meaningful for.
pub const DEFAULT_BUDGET_FLOOR: u64 = 25_000;

#[derive(Clone, Debug, PartialEq)]
pub enum RawRequirements {
    /// Text expected to contain a mapping-shaped fragment.
    Text(String),
    /// An already structured mapping.
    Map(Map<String, Value>),
}

impl RawRequirements {
    /// JSON objects become [`RawRequirements::Map`], strings become text, and
    /// anything else is kept as its JSON text so it fails canonicalization
    /// with a useful message.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Map(map),
            Value::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }

    fn fields(&self) -> HashMap<&'static str, String> {
        let keys = requirement_keys();
        match self {
            Self::Text(text) => fragment::scan(text, &keys),
            Self::Map(map) => keys
                .iter()
                .filter_map(|key| lookup(map, key).map(|value| (*key, value)))
                .collect(),
        }
    }
}

impl From<&str> for RawRequirements {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawRequirements {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Map<String, Value>> for RawRequirements {
    fn from(value: Map<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl From<&Requirements> for RawRequirements {
    fn from(value: &Requirements) -> Self {
        Self::Map(value.to_map())
    }
}

/// Acceptance rules applied while canonicalizing requirements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequirementPolicy {
    pub budget_floor: u64,
}

impl Default for RequirementPolicy {
    fn default() -> Self {
        Self { budget_floor: DEFAULT_BUDGET_FLOOR }
    }
}

/// Resolves all six requirement keys or fails; nothing is defaulted.
///
/// Missing keys and out-of-vocabulary levels yield
/// [`DomainError::MalformedRequirements`]. A budget that does not normalize to
/// a whole amount, or that falls under `policy.budget_floor`, yields
/// [`DomainError::InvalidBudget`].
pub fn canonicalize(
    raw: &RawRequirements,
    policy: &RequirementPolicy,
) -> Result<Requirements, DomainError> {
    let fields = raw.fields();

    let missing: Vec<&str> =
        requirement_keys().into_iter().filter(|key| !fields.contains_key(key)).collect();
    if !missing.is_empty() {
        return Err(DomainError::MalformedRequirements(format!(
            "could not resolve {}",
            quote_list(&missing)
        )));
    }

    let mut levels = [Level::Low; 5];
    let mut out_of_vocabulary = Vec::new();
    for (slot, attribute) in levels.iter_mut().zip(Attribute::ALL) {
        let raw_value = &fields[attribute.key()];
        match Level::fold(raw_value) {
            Some(level) => *slot = level,
            None => out_of_vocabulary.push(format!("`{}` = `{raw_value}`", attribute.key())),
        }
    }
    if !out_of_vocabulary.is_empty() {
        return Err(DomainError::MalformedRequirements(format!(
            "values outside low|medium|high: {}",
            out_of_vocabulary.join(", ")
        )));
    }

    let raw_budget = &fields[BUDGET_KEY];
    let budget = budget::parse_amount(raw_budget)
        .ok_or_else(|| BudgetIssue::Unparsable { raw: raw_budget.clone() })?;
    if budget < policy.budget_floor {
        return Err(BudgetIssue::BelowFloor { budget, floor: policy.budget_floor }.into());
    }

    let [gpu_intensity, display_quality, portability, multitasking, processing_speed] = levels;
    Ok(Requirements {
        gpu_intensity,
        display_quality,
        portability,
        multitasking,
        processing_speed,
        budget,
    })
}

/// Builds a feature record from a catalog row's feature field.
///
/// Returns `None` when the value holds no recognizable mapping at all. Keys
/// that are missing or out of vocabulary stay unknown rather than failing.
pub fn canonicalize_features(value: &Value) -> Option<FeatureRecord> {
    let keys = Attribute::ALL.map(|attribute| attribute.key());
    let fields: HashMap<&str, String> = match value {
        Value::Object(map) => {
            keys.iter().filter_map(|key| lookup(map, key).map(|value| (*key, value))).collect()
        }
        Value::String(text) => fragment::scan(text, &keys),
        _ => return None,
    };

    if fields.is_empty() {
        return None;
    }

    let mut record = FeatureRecord::default();
    for attribute in Attribute::ALL {
        record.set(attribute, fields.get(attribute.key()).and_then(|raw| Level::fold(raw)));
    }
    Some(record)
}

fn requirement_keys() -> [&'static str; 6] {
    let [a, b, c, d, e] = Attribute::ALL.map(|attribute| attribute.key());
    [a, b, c, d, e, BUDGET_KEY]
}

fn lookup(map: &Map<String, Value>, key: &str) -> Option<String> {
    let value = map
        .iter()
        .find(|(candidate, _)| candidate.trim().eq_ignore_ascii_case(key))
        .map(|(_, value)| value)?;
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn quote_list(keys: &[&str]) -> String {
    keys.iter().map(|key| format!("`{key}`")).collect::<Vec<_>>().join(", ")
}
