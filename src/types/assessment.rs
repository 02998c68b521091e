//! Donation quality assessment derived from a verdict

use crate::types::backend::BackendKind;
use crate::types::verdict::{Classification, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Not-fresh verdicts below this index are rejected
pub const REJECT_BELOW_INDEX: u8 = 60;

/// Index from which an unlabelled middle verdict still grades fair
const FAIR_FROM_INDEX: u8 = 50;

/// Quality grade shown to donors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::Excellent => "excellent",
            QualityGrade::Good => "good",
            QualityGrade::Fair => "fair",
            QualityGrade::Poor => "poor",
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Approved,
    Rejected,
}

/// Grade and approval of one verdict, tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Backend that answered, which may be a fallback
    pub backend_id: String,
    pub quality_score: u8,
    pub grade: QualityGrade,
    pub status: ApprovalStatus,
}

impl Assessment {
    /// Assess a verdict produced by a backend of `kind`.
    pub fn from_verdict(backend_id: impl Into<String>, kind: BackendKind, verdict: &Verdict) -> Self {
        let index = verdict.freshness_index;
        let status = if is_rejectable(kind, verdict.classification) && index < REJECT_BELOW_INDEX {
            ApprovalStatus::Rejected
        } else {
            ApprovalStatus::Approved
        };

        Self {
            backend_id: backend_id.into(),
            quality_score: index,
            grade: grade(kind, verdict.classification, index),
            status,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }
}

fn grade(kind: BackendKind, classification: Classification, index: u8) -> QualityGrade {
    use Classification::*;

    let by_index = if index >= FAIR_FROM_INDEX {
        QualityGrade::Fair
    } else {
        QualityGrade::Poor
    };

    match (kind, classification) {
        (_, Fresh) => QualityGrade::Excellent,
        (BackendKind::TabularClassifier, Stale) => QualityGrade::Good,
        (BackendKind::TabularClassifier, _) => QualityGrade::Poor,
        (BackendKind::ImageBinaryRegression, MediumFresh) => QualityGrade::Good,
        (BackendKind::ObjectDetection, Mixed) => QualityGrade::Fair,
        (BackendKind::ObjectDetection, _) => QualityGrade::Poor,
        (BackendKind::ImageMulticlass | BackendKind::ImageBinaryRegression, _) => by_index,
    }
}

/// Classifications that mean the item should not be donated
fn is_rejectable(kind: BackendKind, classification: Classification) -> bool {
    use Classification::*;

    match kind {
        BackendKind::TabularClassifier => classification == Spoiled,
        BackendKind::ImageMulticlass => matches!(classification, Stale | Rotten),
        BackendKind::ImageBinaryRegression => classification == NotFresh,
        BackendKind::ObjectDetection => classification == Rotten,
    }
}
