//! Backend loading with artifact and credential preflight

use crate::config::BackendConfig;
use crate::error::{FreshnessError, Result};
use crate::feature_extractor::FeatureExtractor;
use crate::models::labels::LabelSet;
use crate::types::backend::{BackendInput, BackendKind, BackendResult};
use crate::types::reading::EnvironmentReading;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A loaded freshness model able to turn an input into a raw result.
pub trait FreshnessBackend: Send + Sync {
    /// Kind of raw result this backend produces
    fn kind(&self) -> BackendKind;

    /// Run inference. May block.
    fn predict(&self, input: &BackendInput) -> Result<BackendResult>;
}

/// Shared handle to a loaded backend
pub type BackendHandle = Arc<dyn FreshnessBackend>;

/// Loads a backend by id. Called by the registry at most once per attempt.
pub trait BackendLoader: Send + Sync {
    fn load(&self, backend_id: &str) -> Result<BackendHandle>;
}

/// Builds a backend once its artifacts are known to be present.
pub type BackendFactory = Arc<dyn Fn(&str, &BackendConfig) -> Result<BackendHandle> + Send + Sync>;

/// Backend whose model runs in another process and reports raw results.
pub struct RemoteBackend {
    backend_id: String,
    kind: BackendKind,
    labels: Option<LabelSet>,
}

impl RemoteBackend {
    pub fn new(backend_id: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            backend_id: backend_id.into(),
            kind,
            labels: None,
        }
    }

    /// Decode reported class-probability vectors with `labels`.
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = Some(labels);
        self
    }
}

impl FreshnessBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn predict(&self, input: &BackendInput) -> Result<BackendResult> {
        match input {
            BackendInput::Reported { result } => Ok(result.clone()),
            BackendInput::Probabilities { probabilities } => match &self.labels {
                Some(labels) => labels.to_result(probabilities),
                None => Err(FreshnessError::InvalidInput(format!(
                    "backend '{}' has no label set to decode class probabilities",
                    self.backend_id
                ))),
            },
            other => Err(FreshnessError::InvalidInput(format!(
                "backend '{}' runs out of process and only accepts reported results, got {} input",
                self.backend_id,
                other.type_name()
            ))),
        }
    }
}

/// Time stored below which a low-gas item is fresh
const FRESH_HOURS: f64 = 24.0;
/// Time stored below which an item is stale rather than spoiled
const STALE_HOURS: f64 = 48.0;
/// Gas concentration below which an item can be fresh
const FRESH_GAS: f64 = 200.0;

/// In-process tabular backend for environmental readings.
///
/// Applies the storage rule the environmental classifier was trained on:
/// 0 = fresh, 1 = stale, 2 = spoiled.
pub struct StorageRuleBackend {
    extractor: FeatureExtractor,
}

impl StorageRuleBackend {
    pub fn new() -> Self {
        Self {
            extractor: FeatureExtractor::new(),
        }
    }

    fn class_index(reading: &EnvironmentReading) -> i64 {
        let (time_stored, gas) = (reading.time_stored_hours, reading.gas);
        if time_stored < FRESH_HOURS && gas < FRESH_GAS {
            0
        } else if time_stored < STALE_HOURS {
            1
        } else {
            2
        }
    }
}

impl Default for StorageRuleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FreshnessBackend for StorageRuleBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::TabularClassifier
    }

    fn predict(&self, input: &BackendInput) -> Result<BackendResult> {
        match input {
            BackendInput::Environment(reading) => {
                let features = self.extractor.extract_checked(reading)?;
                let class_index = Self::class_index(reading);
                debug!(features = ?features, class_index = class_index, "Storage rule applied");
                Ok(BackendResult::TabularClassifier { class_index })
            }
            BackendInput::Reported { result } => Ok(result.clone()),
            other => Err(FreshnessError::InvalidInput(format!(
                "tabular backend expects an environment reading, got {} input",
                other.type_name()
            ))),
        }
    }
}

/// Loader that checks each backend's artifact file and credential before
/// handing over to a factory.
pub struct ArtifactLoader {
    backends: HashMap<String, BackendConfig>,
    factory: BackendFactory,
}

impl ArtifactLoader {
    /// Loader producing the built-in backends: [`StorageRuleBackend`] for
    /// tabular classifiers and [`RemoteBackend`] for everything else.
    pub fn new(backends: HashMap<String, BackendConfig>) -> Self {
        Self::with_factory(backends, Arc::new(default_backend))
    }

    pub fn with_factory(backends: HashMap<String, BackendConfig>, factory: BackendFactory) -> Self {
        Self { backends, factory }
    }

    /// Verify the artifact and credential of a backend exist.
    pub fn preflight(&self, backend_id: &str) -> Result<&BackendConfig> {
        let config = self
            .backends
            .get(backend_id)
            .ok_or_else(|| FreshnessError::UnknownBackend(backend_id.to_string()))?;

        if let Some(artifact) = &config.artifact_path {
            if !Path::new(artifact).is_file() {
                return Err(FreshnessError::ModelUnavailable {
                    backend: backend_id.to_string(),
                    reason: format!(
                        "Model file not found: {}. Copy the model artifact there or set backends.{}.artifact_path.",
                        artifact, backend_id
                    ),
                });
            }
        }

        if let Some(var) = &config.credential_env {
            let present = std::env::var(var)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(FreshnessError::ModelUnavailable {
                    backend: backend_id.to_string(),
                    reason: format!("{} is not set. Export the credential and retry.", var),
                });
            }
        }

        Ok(config)
    }
}

fn default_backend(backend_id: &str, config: &BackendConfig) -> Result<BackendHandle> {
    if config.kind == BackendKind::TabularClassifier {
        return Ok(Arc::new(StorageRuleBackend::new()));
    }

    let mut backend = RemoteBackend::new(backend_id, config.kind);
    if let Some(name) = config.label_set {
        if config.kind != BackendKind::ImageMulticlass {
            return Err(FreshnessError::Config(format!(
                "backend '{}' sets label_set but is not an image_multiclass backend",
                backend_id
            )));
        }
        backend = backend.with_labels(LabelSet::builtin(name));
    }
    Ok(Arc::new(backend))
}

impl BackendLoader for ArtifactLoader {
    fn load(&self, backend_id: &str) -> Result<BackendHandle> {
        let config = self.preflight(backend_id)?;

        info!(
            backend = %backend_id,
            kind = %config.kind,
            artifact = config.artifact_path.as_deref().unwrap_or("-"),
            "Loading backend"
        );

        let handle = (self.factory)(backend_id, config)?;
        if handle.kind() != config.kind {
            return Err(FreshnessError::Config(format!(
                "backend '{}' is configured as {} but loaded as {}",
                backend_id,
                config.kind,
                handle.kind()
            )));
        }

        info!(backend = %backend_id, "Backend loaded successfully");
        Ok(handle)
    }
}
