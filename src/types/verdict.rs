//! Canonical verdict returned for every backend

use crate::types::backend::BackendKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification label of a verdict.
///
/// Each backend kind draws from its own subset, see [`Classification::allowed_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Fresh,
    Stale,
    Spoiled,
    Rotten,
    MediumFresh,
    NotFresh,
    Mixed,
}

const TABULAR_CLASSES: &[Classification] = &[
    Classification::Fresh,
    Classification::Stale,
    Classification::Spoiled,
];
const MULTICLASS_CLASSES: &[Classification] = &[
    Classification::Fresh,
    Classification::Stale,
    Classification::Rotten,
];
const BINARY_CLASSES: &[Classification] = &[
    Classification::Fresh,
    Classification::MediumFresh,
    Classification::NotFresh,
];
const DETECTION_CLASSES: &[Classification] = &[
    Classification::Fresh,
    Classification::Rotten,
    Classification::Mixed,
];

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Fresh => "fresh",
            Classification::Stale => "stale",
            Classification::Spoiled => "spoiled",
            Classification::Rotten => "rotten",
            Classification::MediumFresh => "medium_fresh",
            Classification::NotFresh => "not_fresh",
            Classification::Mixed => "mixed",
        }
    }

    /// Labels a backend of `kind` may report.
    pub fn allowed_for(kind: BackendKind) -> &'static [Classification] {
        match kind {
            BackendKind::TabularClassifier => TABULAR_CLASSES,
            BackendKind::ImageMulticlass => MULTICLASS_CLASSES,
            BackendKind::ImageBinaryRegression => BINARY_CLASSES,
            BackendKind::ObjectDetection => DETECTION_CLASSES,
        }
    }

    /// Parse the freshness state prefix of a multiclass label.
    pub fn from_state(state: &str) -> Option<Self> {
        match state.trim().to_ascii_lowercase().as_str() {
            "fresh" => Some(Classification::Fresh),
            "stale" => Some(Classification::Stale),
            "rotten" => Some(Classification::Rotten),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nutrition facts per serving, grams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub protein_g: Option<f64>,
    pub calcium_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub carbohydrates_g: Option<f64>,
    pub vitamins_g: Option<f64>,
}

/// Normalized freshness assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Backend-specific classification label
    pub classification: Classification,

    /// 0 = inedible, 100 = maximally fresh
    pub freshness_index: u8,

    /// Recognized food item, e.g. "apple"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    /// Backend confidence (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

impl Verdict {
    /// Create a verdict; the index is capped at 100.
    pub fn new(classification: Classification, freshness_index: u8) -> Self {
        Self {
            classification,
            freshness_index: freshness_index.min(100),
            item_type: None,
            confidence: None,
            nutrition: None,
        }
    }

    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_nutrition(mut self, nutrition: Nutrition) -> Self {
        self.nutrition = Some(nutrition);
        self
    }
}
