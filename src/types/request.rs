//! Wire messages exchanged over the message bus

use crate::error::FreshnessError;
use crate::types::assessment::Assessment;
use crate::types::backend::BackendInput;
use crate::types::verdict::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to evaluate one input on one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Caller-chosen identifier echoed in the reply
    pub request_id: String,

    /// Configured backend id, e.g. "freshvision"
    pub backend_id: String,

    /// Input or already-computed raw result
    pub input: BackendInput,

    /// Submission timestamp
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl EvaluationRequest {
    pub fn new(request_id: impl Into<String>, backend_id: impl Into<String>, input: BackendInput) -> Self {
        Self {
            request_id: request_id.into(),
            backend_id: backend_id.into(),
            input,
            submitted_at: Utc::now(),
        }
    }
}

/// Result of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Ok { verdict: Verdict },
    Error { category: String, message: String },
}

impl From<&FreshnessError> for Outcome {
    fn from(err: &FreshnessError) -> Self {
        Outcome::Error {
            category: err.category().to_string(),
            message: err.to_string(),
        }
    }
}

/// Reply published for every evaluation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictEnvelope {
    /// Unique envelope identifier
    pub envelope_id: String,

    pub request_id: String,

    pub backend_id: String,

    pub outcome: Outcome,

    pub evaluated_at: DateTime<Utc>,

    /// End-to-end processing time, microseconds
    #[serde(default)]
    pub processing_time_us: u64,

    /// Quality grade and approval of an ok verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
}

impl VerdictEnvelope {
    /// Envelope for a finished evaluation
    pub fn new(request: &EvaluationRequest, result: &Result<Verdict, FreshnessError>) -> Self {
        let outcome = match result {
            Ok(verdict) => Outcome::Ok {
                verdict: verdict.clone(),
            },
            Err(e) => Outcome::from(e),
        };
        Self::with_outcome(&request.request_id, &request.backend_id, outcome)
    }

    /// Error envelope for a request that never reached a backend.
    ///
    /// Ids the caller did not supply are left empty.
    pub fn rejected(request_id: &str, backend_id: &str, err: &FreshnessError) -> Self {
        Self::with_outcome(request_id, backend_id, Outcome::from(err))
    }

    fn with_outcome(request_id: &str, backend_id: &str, outcome: Outcome) -> Self {
        Self {
            envelope_id: uuid::Uuid::new_v4().to_string(),
            request_id: request_id.to_string(),
            backend_id: backend_id.to_string(),
            outcome,
            evaluated_at: Utc::now(),
            processing_time_us: 0,
            assessment: None,
        }
    }

    pub fn with_assessment(mut self, assessment: Assessment) -> Self {
        self.assessment = Some(assessment);
        self
    }

    pub fn with_processing_time(mut self, processing_time_us: u64) -> Self {
        self.processing_time_us = processing_time_us;
        self
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok { .. })
    }
}
