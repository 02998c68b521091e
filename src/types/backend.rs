//! Raw backend output shapes and inputs

use crate::error::{FreshnessError, Result};
use crate::types::reading::EnvironmentReading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of the underlying classifier; decides which normalization rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Tabular classifier over environmental readings
    TabularClassifier,
    /// Image classifier emitting `<state>_<item>` labels
    ImageMulticlass,
    /// Image classifier emitting a single score
    ImageBinaryRegression,
    /// Object detector emitting labelled boxes
    ObjectDetection,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::TabularClassifier => "tabular_classifier",
            BackendKind::ImageMulticlass => "image_multiclass",
            BackendKind::ImageBinaryRegression => "image_binary_regression",
            BackendKind::ObjectDetection => "object_detection",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object-detector output item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detected class name
    #[serde(rename = "class", alias = "class_name", default)]
    pub label: String,
    /// Detector confidence (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f64,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Raw output of a backend, one shape per [`BackendKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendResult {
    TabularClassifier {
        class_index: i64,
    },
    ImageMulticlass {
        class_label: String,
        confidence: f64,
    },
    ImageBinaryRegression {
        score: f64,
    },
    ObjectDetection {
        #[serde(default)]
        detections: Vec<Detection>,
    },
}

impl BackendResult {
    /// Kind of backend that produces this shape.
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendResult::TabularClassifier { .. } => BackendKind::TabularClassifier,
            BackendResult::ImageMulticlass { .. } => BackendKind::ImageMulticlass,
            BackendResult::ImageBinaryRegression { .. } => BackendKind::ImageBinaryRegression,
            BackendResult::ObjectDetection { .. } => BackendKind::ObjectDetection,
        }
    }
}

/// Meaning of a binary-regression score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDirection {
    /// 0.0 is perfectly fresh
    #[default]
    LowerIsFresher,
    /// 1.0 is perfectly fresh
    HigherIsFresher,
}

impl ScoreDirection {
    /// Express `score` in the lower-is-fresher convention.
    pub fn to_lower_is_fresher(self, score: f64) -> f64 {
        match self {
            ScoreDirection::LowerIsFresher => score,
            ScoreDirection::HigherIsFresher => 1.0 - score,
        }
    }
}

/// Uploaded image handed to an image backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUpload {
    /// MIME type declared by the uploader
    pub content_type: Option<String>,
    /// Encoded image bytes
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            bytes,
        }
    }

    /// Reject uploads that are not images or carry no data.
    pub fn validate(&self) -> Result<()> {
        let is_image = self
            .content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(FreshnessError::InvalidInput(
                "File must be an image (JPEG, PNG, etc.)".to_string(),
            ));
        }
        if self.bytes.is_empty() {
            return Err(FreshnessError::InvalidInput(
                "Could not read image: upload is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input handed to a backend's `predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendInput {
    /// Result already computed by an out-of-process model service
    Reported { result: BackendResult },
    /// Environmental sensor reading for the tabular classifier
    Environment(EnvironmentReading),
    /// Raw image upload, checked against the image precondition.
    ///
    /// Only backends built by a custom
    /// [`BackendFactory`](crate::models::loader::BackendFactory) run images
    /// in-process; the built-in backends reject this input.
    Image(ImageUpload),
    /// Class-probability vector from a multiclass model service
    Probabilities { probabilities: Vec<f32> },
}

impl BackendInput {
    pub fn type_name(&self) -> &'static str {
        match self {
            BackendInput::Reported { .. } => "reported",
            BackendInput::Environment(_) => "environment",
            BackendInput::Image(_) => "image",
            BackendInput::Probabilities { .. } => "probabilities",
        }
    }
}
