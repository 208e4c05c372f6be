use std::fmt;

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::attribute::{Attribute, Level, BUDGET_KEY};

/// Canonical user preference: five ordinal levels plus a budget.
///
/// Only produced by [`crate::canonical::canonicalize`], so every field is
/// guaranteed to be in vocabulary and the budget is at or above the floor
/// that was in force at canonicalization time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Requirements {
    pub gpu_intensity: Level,
    pub display_quality: Level,
    pub portability: Level,
    pub multitasking: Level,
    pub processing_speed: Level,
    pub budget: u64,
}

impl Requirements {
    pub fn level(&self, attribute: Attribute) -> Level {
        match attribute {
            Attribute::GpuIntensity => self.gpu_intensity,
            Attribute::DisplayQuality => self.display_quality,
            Attribute::Portability => self.portability,
            Attribute::Multitasking => self.multitasking,
            Attribute::ProcessingSpeed => self.processing_speed,
        }
    }

    /// Mapping form with the six canonical keys. Feeding this back through
    /// canonicalization yields the same record.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for attribute in Attribute::ALL {
            map.insert(attribute.key().to_string(), Value::from(self.level(attribute).as_str()));
        }
        map.insert(BUDGET_KEY.to_string(), Value::from(self.budget));
        map
    }
}

impl Serialize for Requirements {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_map().serialize(serializer)
    }
}

impl fmt::Display for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for attribute in Attribute::ALL {
            write!(f, "'{}': '{}', ", attribute.key(), self.level(attribute))?;
        }
        write!(f, "'{BUDGET_KEY}': '{}'}}", self.budget)
    }
}
