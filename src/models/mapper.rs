//! Per-backend mapping of a single class or score prediction onto a verdict

use crate::error::{FreshnessError, Result};
use crate::nutrition::normalize_food_name;
use crate::types::verdict::{Classification, Verdict};
use serde::{Deserialize, Serialize};

/// Highest index a not-fresh multiclass verdict may report.
pub const NOT_FRESH_INDEX_CAP: u8 = 45;

/// Fixed table for the tabular classifier: class index -> (label, index).
const TABULAR_TABLE: [(Classification, u8); 3] = [
    (Classification::Fresh, 90),
    (Classification::Stale, 55),
    (Classification::Spoiled, 20),
];

/// Convert a fraction (nominally 0.0 - 1.0) into a 0-100 freshness index.
///
/// Rounds half to even and clamps into range.
pub fn freshness_index(fraction: f64) -> u8 {
    let percent = (fraction * 100.0).round_ties_even();
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(0.0, 100.0) as u8
}

fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FreshnessError::InvalidPrediction(format!(
            "{} must be a finite number, got {}",
            name, value
        )))
    }
}

/// Map a tabular class index (0 fresh, 1 stale, 2 spoiled).
pub fn map_tabular(class_index: i64) -> Result<Verdict> {
    usize::try_from(class_index)
        .ok()
        .and_then(|i| TABULAR_TABLE.get(i))
        .map(|&(classification, index)| Verdict::new(classification, index))
        .ok_or_else(|| {
            FreshnessError::InvalidPrediction(format!(
                "tabular class index must be 0, 1 or 2, got {}",
                class_index
            ))
        })
}

/// Split a `<state>_<item>` label into its state and item type.
pub fn split_class_label(class_label: &str) -> Result<(Classification, Option<String>)> {
    let normalized = normalize_food_name(class_label);
    let (state, item) = match normalized.split_once('_') {
        Some((state, item)) => (state, Some(item)),
        None => (normalized.as_str(), None),
    };

    let classification = Classification::from_state(state).ok_or_else(|| {
        FreshnessError::InvalidPrediction(format!(
            "class label '{}' does not start with fresh, stale or rotten",
            class_label
        ))
    })?;

    let item_type = item.filter(|i| !i.is_empty()).map(str::to_string);
    Ok((classification, item_type))
}

/// Map a multiclass label and its confidence.
pub fn map_multiclass(class_label: &str, confidence: f64) -> Result<Verdict> {
    ensure_finite("confidence", confidence)?;
    let (classification, item_type) = split_class_label(class_label)?;

    let index = if classification == Classification::Fresh {
        freshness_index(confidence)
    } else {
        freshness_index(1.0 - confidence).min(NOT_FRESH_INDEX_CAP)
    };

    let mut verdict = Verdict::new(classification, index).with_confidence(confidence);
    if let Some(item_type) = item_type {
        verdict = verdict.with_item_type(item_type);
    }
    Ok(verdict)
}

/// Ordered score thresholds for the binary-regression backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryThresholds {
    /// Scores below this are fresh
    pub fresh: f64,
    /// Scores below this (and at or above `fresh`) are medium fresh
    pub medium: f64,
}

impl BinaryThresholds {
    /// Create thresholds; requires `0 <= fresh < medium <= 1`.
    pub fn new(fresh: f64, medium: f64) -> Result<Self> {
        let thresholds = Self { fresh, medium };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if in_unit(self.fresh) && in_unit(self.medium) && self.fresh < self.medium {
            Ok(())
        } else {
            Err(FreshnessError::Config(format!(
                "binary thresholds must satisfy 0 <= fresh < medium <= 1, got fresh={} medium={}",
                self.fresh, self.medium
            )))
        }
    }

    /// Bucket a lower-is-fresher score. A score equal to a threshold falls
    /// into the less fresh bucket.
    pub fn classify(&self, score: f64) -> Classification {
        if score < self.fresh {
            Classification::Fresh
        } else if score < self.medium {
            Classification::MediumFresh
        } else {
            Classification::NotFresh
        }
    }
}

impl Default for BinaryThresholds {
    fn default() -> Self {
        Self {
            fresh: 0.10,
            medium: 0.35,
        }
    }
}

/// Map a lower-is-fresher binary-regression score.
pub fn map_binary(score: f64, thresholds: &BinaryThresholds) -> Result<Verdict> {
    ensure_finite("score", score)?;
    Ok(Verdict::new(
        thresholds.classify(score),
        freshness_index(1.0 - score),
    ))
}
