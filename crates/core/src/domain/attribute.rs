use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal level shared by requirements and product features.
///
/// The derived ordering follows declaration order, so `Low < Medium < High`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Low, Level::Medium, Level::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Folds free text into the vocabulary, ignoring case and surrounding
    /// whitespace. Returns `None` for anything outside `low|medium|high`.
    pub fn fold(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the five comparable laptop qualities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    GpuIntensity,
    DisplayQuality,
    Portability,
    Multitasking,
    ProcessingSpeed,
}

/// Canonical key of the budget field in a requirements mapping.
pub const BUDGET_KEY: &str = "Budget";

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::GpuIntensity,
        Attribute::DisplayQuality,
        Attribute::Portability,
        Attribute::Multitasking,
        Attribute::ProcessingSpeed,
    ];

    /// Key used in requirement and feature mappings.
    pub fn key(&self) -> &'static str {
        match self {
            Self::GpuIntensity => "GPU intensity",
            Self::DisplayQuality => "Display quality",
            Self::Portability => "Portability",
            Self::Multitasking => "Multitasking",
            Self::ProcessingSpeed => "Processing speed",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let wanted = key.trim();
        Self::ALL.into_iter().find(|attribute| attribute.key().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
