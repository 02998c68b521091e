//! Type definitions for the freshness pipeline

pub mod assessment;
pub mod backend;
pub mod health;
pub mod reading;
pub mod request;
pub mod verdict;

pub use assessment::{ApprovalStatus, Assessment, QualityGrade};
pub use backend::{BackendInput, BackendKind, BackendResult, Detection, ImageUpload, ScoreDirection};
pub use health::{BackendHealth, HealthReport, HealthStatus};
pub use reading::EnvironmentReading;
pub use request::{EvaluationRequest, Outcome, VerdictEnvelope};
pub use verdict::{Classification, Nutrition, Verdict};
