//! Backend loading, inference and result normalization

pub mod aggregator;
pub mod inference;
pub mod keywords;
pub mod labels;
pub mod loader;
pub mod mapper;
pub mod normalizer;
pub mod registry;

pub use aggregator::DetectionAggregator;
pub use inference::{InferenceEngine, PredictionResult};
pub use keywords::KeywordClassifier;
pub use labels::{LabelSet, LabelSetName};
pub use loader::{ArtifactLoader, BackendLoader, FreshnessBackend};
pub use mapper::BinaryThresholds;
pub use normalizer::NormalizationEngine;
pub use registry::ModelRegistry;
