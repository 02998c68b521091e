//! Dispatch of raw backend results to the matching normalization rule

use crate::error::{FreshnessError, Result};
use crate::models::aggregator::DetectionAggregator;
use crate::models::keywords::KeywordClassifier;
use crate::models::mapper::{self, BinaryThresholds};
use crate::types::backend::{BackendKind, BackendResult};
use crate::types::verdict::{Classification, Verdict};
use tracing::debug;

/// Converts any backend's raw result into the canonical [`Verdict`].
///
/// Holds only immutable configuration, so one engine can be shared across
/// threads without coordination.
#[derive(Debug, Clone, Default)]
pub struct NormalizationEngine {
    aggregator: DetectionAggregator,
    thresholds: BinaryThresholds,
}

impl NormalizationEngine {
    pub fn new(classifier: KeywordClassifier, thresholds: BinaryThresholds) -> Self {
        Self {
            aggregator: DetectionAggregator::new(classifier),
            thresholds,
        }
    }

    /// Normalize `result` produced by a backend of `kind`.
    pub fn normalize(&self, kind: BackendKind, result: &BackendResult) -> Result<Verdict> {
        self.normalize_with(kind, result, &self.thresholds)
    }

    /// Normalize with backend-specific binary-regression thresholds.
    pub fn normalize_with(
        &self,
        kind: BackendKind,
        result: &BackendResult,
        thresholds: &BinaryThresholds,
    ) -> Result<Verdict> {
        if result.kind() != kind {
            return Err(FreshnessError::UnsupportedBackendResult {
                backend_kind: kind,
                result_kind: result.kind(),
            });
        }

        let verdict = match result {
            BackendResult::TabularClassifier { class_index } => mapper::map_tabular(*class_index)?,
            BackendResult::ImageMulticlass {
                class_label,
                confidence,
            } => mapper::map_multiclass(class_label, *confidence)?,
            BackendResult::ImageBinaryRegression { score } => mapper::map_binary(*score, thresholds)?,
            BackendResult::ObjectDetection { detections } => {
                if let Some(bad) = detections.iter().find(|d| !d.confidence.is_finite()) {
                    return Err(FreshnessError::InvalidPrediction(format!(
                        "detection '{}' has non-finite confidence {}",
                        bad.label, bad.confidence
                    )));
                }
                self.aggregator.aggregate(detections)
            }
        };

        debug_assert!(Classification::allowed_for(kind).contains(&verdict.classification));
        debug!(
            kind = %kind,
            classification = %verdict.classification,
            freshness_index = verdict.freshness_index,
            "Backend result normalized"
        );

        Ok(verdict)
    }
}
