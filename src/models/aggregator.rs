//! Reduction of object-detection output into a single verdict

use crate::models::keywords::{KeywordClassifier, LabelFreshness};
use crate::models::mapper::freshness_index;
use crate::types::backend::Detection;
use crate::types::verdict::{Classification, Verdict};

/// Index reported when the detector found nothing.
pub const EMPTY_DETECTIONS_INDEX: u8 = 70;

/// Not-fresh confidence at which a mixed scene counts as rotten.
pub const ROTTEN_CONFIDENCE: f64 = 0.5;

/// Detection confidences grouped by the freshness their label implies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionGroups {
    pub fresh: Vec<f64>,
    pub not_fresh: Vec<f64>,
}

impl DetectionGroups {
    /// Highest fresh confidence, if any fresh detection exists
    pub fn best_fresh(&self) -> Option<f64> {
        max_confidence(&self.fresh)
    }

    /// Highest not-fresh confidence, if any not-fresh detection exists
    pub fn worst_not_fresh(&self) -> Option<f64> {
        max_confidence(&self.not_fresh)
    }
}

fn max_confidence(confidences: &[f64]) -> Option<f64> {
    confidences.iter().copied().reduce(f64::max)
}

/// Reduces a list of detections into one verdict.
///
/// Only the maximum confidence of each group matters, so the result does not
/// depend on detection order.
#[derive(Debug, Clone, Default)]
pub struct DetectionAggregator {
    classifier: KeywordClassifier,
}

impl DetectionAggregator {
    /// Create an aggregator using the given label classifier.
    pub fn new(classifier: KeywordClassifier) -> Self {
        Self { classifier }
    }

    /// Split detections into fresh and not-fresh confidences.
    pub fn partition(&self, detections: &[Detection]) -> DetectionGroups {
        let mut groups = DetectionGroups::default();
        for detection in detections {
            match self.classifier.classify(detection.label.trim()) {
                LabelFreshness::Fresh => groups.fresh.push(detection.confidence),
                LabelFreshness::NotFresh => groups.not_fresh.push(detection.confidence),
            }
        }
        groups
    }

    /// Aggregate detections into a fresh / rotten / mixed verdict.
    pub fn aggregate(&self, detections: &[Detection]) -> Verdict {
        let groups = self.partition(detections);

        match (groups.best_fresh(), groups.worst_not_fresh()) {
            // No detections: acceptable by default
            (None, None) => Verdict::new(Classification::Fresh, EMPTY_DETECTIONS_INDEX),
            (None, Some(worst)) => Verdict::new(Classification::Rotten, freshness_index(1.0 - worst)),
            (Some(best), None) => Verdict::new(Classification::Fresh, freshness_index(best)),
            (Some(best_fresh), Some(worst_rotten)) => {
                let index = freshness_index(best_fresh * (1.0 - worst_rotten));
                let classification = if worst_rotten >= ROTTEN_CONFIDENCE {
                    Classification::Rotten
                } else {
                    Classification::Mixed
                };
                Verdict::new(classification, index)
            }
        }
    }
}
