//! Freshness Pipeline Library
//!
//! Normalizes the output of heterogeneous food-freshness models into one
//! verdict: a classification plus a 0-100 freshness index.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod nutrition;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{FreshnessError, Result};
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use models::normalizer::NormalizationEngine;
pub use nutrition::NutritionTable;
pub use producer::VerdictProducer;
pub use types::{Assessment, BackendInput, BackendKind, BackendResult, Classification, EvaluationRequest, Verdict, VerdictEnvelope};
