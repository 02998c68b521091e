//! Class-probability decoding for multiclass image backends

use crate::error::{FreshnessError, Result};
use crate::types::backend::BackendResult;
use serde::{Deserialize, Serialize};

const TFLITE_PRODUCE_LABELS: &[&str] = &[
    "fresh_apple",
    "stale_apple",
    "fresh_banana",
    "stale_banana",
    "fresh_bitter_gourd",
    "stale_bitter_gourd",
    "fresh_capsicum",
    "stale_capsicum",
    "fresh_orange",
    "stale_orange",
    "fresh_tomato",
    "stale_tomato",
];

const FRESHVISION_LABELS: &[&str] = &[
    "fresh_apple",
    "fresh_banana",
    "fresh_orange",
    "rotten_apple",
    "rotten_banana",
    "rotten_orange",
];

/// Built-in label orderings of the known multiclass models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSetName {
    /// 12-class fresh/stale produce model
    TfliteProduce,
    /// 6-class fresh/rotten fruit model
    Freshvision,
}

/// Ordered class labels matching a model's output indices.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn builtin(name: LabelSetName) -> Self {
        match name {
            LabelSetName::TfliteProduce => Self::new(TFLITE_PRODUCE_LABELS.iter().copied()),
            LabelSetName::Freshvision => Self::new(FRESHVISION_LABELS.iter().copied()),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Pick the most probable class. Returns (label, probability).
    pub fn decode(&self, probabilities: &[f32]) -> Result<(String, f64)> {
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
            return Err(FreshnessError::InvalidPrediction(format!(
                "class probabilities must be finite, got {}",
                bad
            )));
        }

        let (index, &probability) = probabilities
            .iter()
            .enumerate()
            .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
            .ok_or_else(|| {
                FreshnessError::InvalidPrediction("model returned no class probabilities".to_string())
            })?;

        let label = self.label(index).ok_or_else(|| {
            FreshnessError::InvalidPrediction(format!(
                "predicted class {} is outside the {} known labels",
                index,
                self.len()
            ))
        })?;

        Ok((label.to_string(), probability as f64))
    }

    /// Decode a probability vector straight into a multiclass backend result.
    pub fn to_result(&self, probabilities: &[f32]) -> Result<BackendResult> {
        let (class_label, confidence) = self.decode(probabilities)?;
        Ok(BackendResult::ImageMulticlass {
            class_label,
            confidence,
        })
    }
}
