use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::attribute::{Attribute, Level};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// Structured product qualities. `None` marks a key the extractor could not
/// resolve; it ranks below every real requirement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeatureRecord {
    pub gpu_intensity: Option<Level>,
    pub display_quality: Option<Level>,
    pub portability: Option<Level>,
    pub multitasking: Option<Level>,
    pub processing_speed: Option<Level>,
}

impl FeatureRecord {
    pub fn get(&self, attribute: Attribute) -> Option<Level> {
        match attribute {
            Attribute::GpuIntensity => self.gpu_intensity,
            Attribute::DisplayQuality => self.display_quality,
            Attribute::Portability => self.portability,
            Attribute::Multitasking => self.multitasking,
            Attribute::ProcessingSpeed => self.processing_speed,
        }
    }

    pub fn set(&mut self, attribute: Attribute, level: Option<Level>) {
        let slot = match attribute {
            Attribute::GpuIntensity => &mut self.gpu_intensity,
            Attribute::DisplayQuality => &mut self.display_quality,
            Attribute::Portability => &mut self.portability,
            Attribute::Multitasking => &mut self.multitasking,
            Attribute::ProcessingSpeed => &mut self.processing_speed,
        };
        *slot = level;
    }

    pub fn is_complete(&self) -> bool {
        Attribute::ALL.iter().all(|attribute| self.get(*attribute).is_some())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for attribute in Attribute::ALL {
            let value = match self.get(attribute) {
                Some(level) => Value::from(level.as_str()),
                None => Value::Null,
            };
            map.insert(attribute.key().to_string(), value);
        }
        map
    }
}

/// One catalog row.
///
/// `price` is `None` when the stored price could not be normalized; such rows
/// stay in the snapshot but never survive the budget filter. `attributes`
/// holds every column of the source row untouched except the feature field.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Option<u64>,
    pub attributes: Map<String, Value>,
    pub features: Option<FeatureRecord>,
}

impl Product {
    pub fn description(&self) -> Option<&str> {
        self.attributes.get("Description").and_then(Value::as_str)
    }
}
