//! Error types for the freshness pipeline

use crate::types::backend::BackendKind;
use thiserror::Error;

/// Errors raised while loading backends or normalizing their output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FreshnessError {
    /// Model artifact or external credential is missing
    #[error("Model unavailable for backend '{backend}': {reason}")]
    ModelUnavailable { backend: String, reason: String },

    /// Caller-supplied content does not meet the backend's precondition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Raw result shape does not match the declared backend kind
    #[error("Unsupported backend result: backend is {backend_kind}, result is {result_kind}")]
    UnsupportedBackendResult {
        backend_kind: BackendKind,
        result_kind: BackendKind,
    },

    /// Backend produced a prediction outside its output domain
    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),

    /// No backend is configured under this id
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// Backend inference did not finish in time
    #[error("Inference on backend '{backend}' timed out after {timeout_ms} ms")]
    InferenceTimeout { backend: String, timeout_ms: u64 },

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal failures (poisoned locks, aborted tasks)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FreshnessError {
    /// Stable snake_case name of the error kind.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ModelUnavailable { .. } => "model_unavailable",
            Self::InvalidInput(_) => "invalid_input",
            Self::UnsupportedBackendResult { .. } => "unsupported_backend_result",
            Self::InvalidPrediction(_) => "invalid_prediction",
            Self::UnknownBackend(_) => "unknown_backend",
            Self::InferenceTimeout { .. } => "inference_timeout",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// True when the backend could not answer at all, so another may.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. } | Self::InferenceTimeout { .. })
    }

    /// True when the caller sent something unusable.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Convenience Result type using the pipeline error
pub type Result<T> = std::result::Result<T, FreshnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = FreshnessError::ModelUnavailable {
            backend: "freshvision".to_string(),
            reason: "model file not found".to_string(),
        };
        assert_eq!(err.category(), "model_unavailable");
        assert!(!err.is_client_error());

        let err = FreshnessError::InvalidInput("file must be an image".to_string());
        assert_eq!(err.category(), "invalid_input");
        assert!(err.is_client_error());
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_unavailable_errors() {
        let unavailable = FreshnessError::ModelUnavailable {
            backend: "tflite".to_string(),
            reason: "model file not found".to_string(),
        };
        let timeout = FreshnessError::InferenceTimeout {
            backend: "tflite".to_string(),
            timeout_ms: 5000,
        };
        assert!(unavailable.is_unavailable());
        assert!(timeout.is_unavailable());
        assert!(!FreshnessError::InvalidPrediction("nan".to_string()).is_unavailable());
        assert!(!FreshnessError::UnknownBackend("x".to_string()).is_unavailable());
    }

    #[test]
    fn test_error_messages_name_the_backend() {
        let err = FreshnessError::ModelUnavailable {
            backend: "roboflow".to_string(),
            reason: "ROBOFLOW_API_KEY is not set".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("roboflow"));
        assert!(msg.contains("ROBOFLOW_API_KEY"));

        let err = FreshnessError::UnsupportedBackendResult {
            backend_kind: BackendKind::TabularClassifier,
            result_kind: BackendKind::ObjectDetection,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported backend result: backend is tabular_classifier, result is object_detection"
        );
    }
}
