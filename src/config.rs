//! Configuration management for the freshness pipeline

use crate::models::keywords::DEFAULT_NOT_FRESH_KEYWORDS;
use crate::models::labels::LabelSetName;
use crate::models::mapper::BinaryThresholds;
use crate::types::backend::{BackendKind, ScoreDirection};
use anyhow::{bail, Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub normalization: NormalizationConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub nutrition: Option<NutritionConfig>,
    /// Backends by id
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming evaluation requests
    pub request_subject: String,
    /// Subject for outgoing verdicts
    pub verdict_subject: String,
    /// Subject answering health probes
    pub health_subject: String,
}

/// Normalization rules shared by every backend
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizationConfig {
    /// Substrings marking a detection label as not fresh
    #[serde(default = "default_not_fresh_keywords")]
    pub not_fresh_keywords: Vec<String>,
    /// Binary-regression scores below this are fresh
    #[serde(default = "default_fresh_threshold")]
    pub fresh_threshold: f64,
    /// Binary-regression scores below this are medium fresh
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,
}

fn default_not_fresh_keywords() -> Vec<String> {
    DEFAULT_NOT_FRESH_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_fresh_threshold() -> f64 {
    BinaryThresholds::default().fresh
}

fn default_medium_threshold() -> f64 {
    BinaryThresholds::default().medium
}

impl NormalizationConfig {
    pub fn thresholds(&self) -> BinaryThresholds {
        BinaryThresholds {
            fresh: self.fresh_threshold,
            medium: self.medium_threshold,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests processed concurrently
    pub workers: usize,
    /// Inference timeout in milliseconds
    pub timeout_ms: u64,
    /// Seconds between metrics summaries (default: 30)
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

/// Nutrition enrichment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NutritionConfig {
    /// TOML file with one table per food name
    pub table_path: String,
}

/// One model backend
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Kind of raw result the backend produces
    pub kind: BackendKind,
    /// Model file that must exist before the backend loads
    #[serde(default)]
    pub artifact_path: Option<String>,
    /// Environment variable holding the backend's API key
    #[serde(default)]
    pub credential_env: Option<String>,
    /// Meaning of binary-regression scores
    #[serde(default)]
    pub score_direction: ScoreDirection,
    /// Label ordering for multiclass probability vectors
    #[serde(default)]
    pub label_set: Option<LabelSetName>,
    /// Overrides `normalization.fresh_threshold`
    #[serde(default)]
    pub fresh_threshold: Option<f64>,
    /// Overrides `normalization.medium_threshold`
    #[serde(default)]
    pub medium_threshold: Option<f64>,
    /// Backends tried in order when this one is unavailable or times out
    #[serde(default)]
    pub fallback: Vec<String>,
}

impl BackendConfig {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            artifact_path: None,
            credential_env: None,
            score_direction: ScoreDirection::default(),
            label_set: None,
            fresh_threshold: None,
            medium_threshold: None,
            fallback: Vec::new(),
        }
    }

    /// Binary thresholds for this backend, falling back to `defaults`.
    pub fn thresholds(&self, defaults: &BinaryThresholds) -> BinaryThresholds {
        BinaryThresholds {
            fresh: self.fresh_threshold.unwrap_or(defaults.fresh),
            medium: self.medium_threshold.unwrap_or(defaults.medium),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let defaults = self.normalization.thresholds();
        defaults
            .validate()
            .context("Invalid [normalization] thresholds")?;

        if self
            .normalization
            .not_fresh_keywords
            .iter()
            .all(|k| k.trim().is_empty())
        {
            bail!("normalization.not_fresh_keywords must contain at least one keyword");
        }
        if self.pipeline.workers == 0 {
            bail!("pipeline.workers must be greater than zero");
        }
        if self.pipeline.timeout_ms == 0 {
            bail!("pipeline.timeout_ms must be greater than zero");
        }
        if self.backends.is_empty() {
            bail!("at least one [backends.<id>] table is required");
        }

        for (id, backend) in &self.backends {
            backend
                .thresholds(&defaults)
                .validate()
                .with_context(|| format!("Invalid thresholds for backend '{}'", id))?;
            if backend.label_set.is_some() && backend.kind != BackendKind::ImageMulticlass {
                bail!("backend '{}' sets label_set but is {}", id, backend.kind);
            }
            for next in &backend.fallback {
                if next == id {
                    bail!("backend '{}' lists itself as a fallback", id);
                }
                if !self.backends.contains_key(next) {
                    bail!("backend '{}' falls back to unknown backend '{}'", id, next);
                }
            }
        }

        Ok(())
    }

    /// Sorted backend ids
    pub fn backend_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.backends.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut backends = HashMap::new();
        backends.insert(
            "env".to_string(),
            BackendConfig::new(BackendKind::TabularClassifier),
        );

        let mut tflite = BackendConfig::new(BackendKind::ImageMulticlass);
        tflite.artifact_path = Some("models/model.tflite".to_string());
        tflite.label_set = Some(LabelSetName::TfliteProduce);
        backends.insert("tflite".to_string(), tflite);

        let mut freshvision = BackendConfig::new(BackendKind::ImageMulticlass);
        freshvision.artifact_path = Some("models/effnetb0_freshvision.pt".to_string());
        freshvision.label_set = Some(LabelSetName::Freshvision);
        backends.insert("freshvision".to_string(), freshvision);

        let mut mobilenet = BackendConfig::new(BackendKind::ImageBinaryRegression);
        mobilenet.artifact_path = Some("models/rottenvsfresh.h5".to_string());
        backends.insert("mobilenet".to_string(), mobilenet);

        let mut roboflow = BackendConfig::new(BackendKind::ObjectDetection);
        roboflow.credential_env = Some("ROBOFLOW_API_KEY".to_string());
        backends.insert("roboflow".to_string(), roboflow);

        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "freshness.requests".to_string(),
                verdict_subject: "freshness.verdicts".to_string(),
                health_subject: "freshness.health".to_string(),
            },
            normalization: NormalizationConfig {
                not_fresh_keywords: default_not_fresh_keywords(),
                fresh_threshold: default_fresh_threshold(),
                medium_threshold: default_medium_threshold(),
            },
            pipeline: PipelineConfig {
                workers: 4,
                timeout_ms: 5000,
                metrics_interval_secs: default_metrics_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
            nutrition: None,
            backends,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.normalization.fresh_threshold, 0.10);
        assert_eq!(config.normalization.medium_threshold, 0.35);
        assert_eq!(config.backends.len(), 5);
        assert_eq!(
            config.backend_ids(),
            vec!["env", "freshvision", "mobilenet", "roboflow", "tflite"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[nats]
url = "nats://nats:4222"
request_subject = "req"
verdict_subject = "out"
health_subject = "health"

[normalization]
fresh_threshold = 0.2
medium_threshold = 0.5

[pipeline]
workers = 2
timeout_ms = 250

[logging]
level = "debug"
format = "pretty"

[backends.mobilenet]
kind = "image_binary_regression"
score_direction = "higher_is_fresher"
medium_threshold = 0.4

[backends.freshvision]
kind = "image_multiclass"
label_set = "freshvision"
fallback = ["mobilenet"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.pipeline.metrics_interval_secs, 30);
        assert_eq!(config.normalization.not_fresh_keywords.len(), 7);

        let mobilenet = &config.backends["mobilenet"];
        assert_eq!(mobilenet.kind, BackendKind::ImageBinaryRegression);
        assert_eq!(mobilenet.score_direction, ScoreDirection::HigherIsFresher);
        let thresholds = mobilenet.thresholds(&config.normalization.thresholds());
        assert_eq!((thresholds.fresh, thresholds.medium), (0.2, 0.4));

        let freshvision = &config.backends["freshvision"];
        assert_eq!(freshvision.label_set, Some(LabelSetName::Freshvision));
        assert_eq!(freshvision.score_direction, ScoreDirection::LowerIsFresher);
        assert_eq!(freshvision.fallback, vec!["mobilenet"]);
        assert!(mobilenet.fallback.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = AppConfig::default();
        config.normalization.fresh_threshold = 0.5;
        config.normalization.medium_threshold = 0.3;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.normalization.not_fresh_keywords = vec![" ".to_string()];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.workers = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.backends.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_backend_overrides() {
        let mut config = AppConfig::default();
        if let Some(mobilenet) = config.backends.get_mut("mobilenet") {
            mobilenet.fresh_threshold = Some(0.9);
        }
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("mobilenet"));

        let mut config = AppConfig::default();
        if let Some(roboflow) = config.backends.get_mut("roboflow") {
            roboflow.label_set = Some(LabelSetName::TfliteProduce);
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_fallback_chain() {
        let mut config = AppConfig::default();
        if let Some(tflite) = config.backends.get_mut("tflite") {
            tflite.fallback = vec!["roboflow".to_string(), "freshvision".to_string()];
        }
        assert!(config.validate().is_ok());

        let mut config = AppConfig::default();
        if let Some(tflite) = config.backends.get_mut("tflite") {
            tflite.fallback = vec!["tflite".to_string()];
        }
        assert!(format!("{:#}", config.validate().unwrap_err()).contains("itself"));

        let mut config = AppConfig::default();
        if let Some(tflite) = config.backends.get_mut("tflite") {
            tflite.fallback = vec!["bedrock".to_string()];
        }
        assert!(format!("{:#}", config.validate().unwrap_err()).contains("bedrock"));
    }
}
