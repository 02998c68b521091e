//! Inference engine: load, bounded predict, normalize, enrich

use crate::config::AppConfig;
use crate::error::{FreshnessError, Result};
use crate::models::keywords::KeywordClassifier;
use crate::models::loader::{ArtifactLoader, BackendHandle, BackendLoader};
use crate::models::mapper::BinaryThresholds;
use crate::models::normalizer::NormalizationEngine;
use crate::models::registry::ModelRegistry;
use crate::nutrition::NutritionTable;
use crate::types::assessment::Assessment;
use crate::types::backend::{BackendInput, BackendKind, BackendResult, ScoreDirection};
use crate::types::health::{BackendHealth, HealthReport};
use crate::types::verdict::Verdict;
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of evaluating one request
#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// Backend that produced the verdict
    pub backend_id: String,
    /// Normalized verdict
    pub verdict: Verdict,
    pub assessment: Assessment,
    /// Raw backend output, as produced by the backend
    pub raw: BackendResult,
    /// Time spent in the backend's predict
    pub inference_time: Duration,
}

/// Per-backend normalization settings
#[derive(Debug, Clone)]
struct BackendSettings {
    kind: BackendKind,
    score_direction: ScoreDirection,
    thresholds: BinaryThresholds,
    fallback: Vec<String>,
}

/// Runs backends through the registry and normalizes their output.
pub struct InferenceEngine {
    registry: Arc<ModelRegistry>,
    normalizer: NormalizationEngine,
    backends: HashMap<String, BackendSettings>,
    nutrition: Option<NutritionTable>,
    timeout: Duration,
}

impl InferenceEngine {
    /// Create a new inference engine from configuration
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let loader = Arc::new(ArtifactLoader::new(config.backends.clone()));
        let mut engine = Self::with_loader(config, loader);

        if let Some(nutrition) = &config.nutrition {
            let table = NutritionTable::load_from_path(&nutrition.table_path)
                .with_context(|| format!("Failed to load nutrition table {}", nutrition.table_path))?;
            engine = engine.with_nutrition(table);
        }

        info!(
            backends = engine.backends.len(),
            timeout_ms = engine.timeout.as_millis() as u64,
            nutrition = engine.nutrition.is_some(),
            "Inference engine initialized"
        );

        Ok(engine)
    }

    /// Create an engine with a custom backend loader
    pub fn with_loader(config: &AppConfig, loader: Arc<dyn BackendLoader>) -> Self {
        let defaults = config.normalization.thresholds();
        let backends = config
            .backends
            .iter()
            .map(|(id, backend)| {
                (
                    id.clone(),
                    BackendSettings {
                        kind: backend.kind,
                        score_direction: backend.score_direction,
                        thresholds: backend.thresholds(&defaults),
                        fallback: backend.fallback.clone(),
                    },
                )
            })
            .collect();

        Self {
            registry: Arc::new(ModelRegistry::new(loader)),
            normalizer: NormalizationEngine::new(
                KeywordClassifier::new(&config.normalization.not_fresh_keywords),
                defaults,
            ),
            backends,
            nutrition: None,
            timeout: Duration::from_millis(config.pipeline.timeout_ms),
        }
    }

    pub fn with_nutrition(mut self, table: NutritionTable) -> Self {
        self.nutrition = Some(table);
        self
    }

    /// Get the number of configured backends
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Get configured backend ids
    pub fn backend_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.backends.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Evaluate `input` with the backend `backend_id`.
    pub async fn evaluate(&self, backend_id: &str, input: BackendInput) -> Result<PredictionResult> {
        let settings = self
            .backends
            .get(backend_id)
            .ok_or_else(|| FreshnessError::UnknownBackend(backend_id.to_string()))?;

        match &input {
            BackendInput::Image(upload) => upload.validate()?,
            BackendInput::Environment(reading) => reading.validate()?,
            BackendInput::Reported { .. } | BackendInput::Probabilities { .. } => {}
        }

        let handle = self.load(backend_id).await?;

        let start = Instant::now();
        let raw = self.predict(backend_id, handle, input).await?;
        let inference_time = start.elapsed();

        let scored = match &raw {
            BackendResult::ImageBinaryRegression { score } => BackendResult::ImageBinaryRegression {
                score: settings.score_direction.to_lower_is_fresher(*score),
            },
            other => other.clone(),
        };

        let mut verdict = self
            .normalizer
            .normalize_with(settings.kind, &scored, &settings.thresholds)?;
        if let Some(table) = &self.nutrition {
            verdict = table.enrich(verdict);
        }

        let assessment = Assessment::from_verdict(backend_id, settings.kind, &verdict);

        debug!(
            backend = %backend_id,
            classification = %verdict.classification,
            freshness_index = verdict.freshness_index,
            grade = %assessment.grade,
            inference_time_us = inference_time.as_micros() as u64,
            "Evaluation complete"
        );

        Ok(PredictionResult {
            backend_id: backend_id.to_string(),
            verdict,
            assessment,
            raw,
            inference_time,
        })
    }

    /// Evaluate on `backend_id`, moving down its `fallback` list while the
    /// current backend is unavailable or times out. Any other outcome is
    /// returned as is; when every backend is unavailable the last error is.
    pub async fn evaluate_with_fallback(
        &self,
        backend_id: &str,
        input: BackendInput,
    ) -> Result<PredictionResult> {
        let fallback = self
            .backends
            .get(backend_id)
            .map(|settings| settings.fallback.as_slice())
            .unwrap_or_default();

        let mut outcome = self.evaluate(backend_id, input.clone()).await;
        let mut current = backend_id;
        for next in fallback {
            match &outcome {
                Err(e) if e.is_unavailable() => {
                    warn!(backend = %current, next = %next, error = %e, "Backend unavailable, falling back");
                }
                _ => break,
            }
            outcome = self.evaluate(next, input.clone()).await;
            current = next.as_str();
        }
        outcome
    }

    async fn load(&self, backend_id: &str) -> Result<BackendHandle> {
        let registry = self.registry.clone();
        let id = backend_id.to_string();
        tokio::task::spawn_blocking(move || registry.get_or_load(&id))
            .await
            .map_err(|e| FreshnessError::Internal(format!("backend load task failed: {}", e)))?
    }

    async fn predict(
        &self,
        backend_id: &str,
        handle: BackendHandle,
        input: BackendInput,
    ) -> Result<BackendResult> {
        let task = tokio::task::spawn_blocking(move || handle.predict(&input));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(FreshnessError::Internal(format!(
                "predict task for '{}' failed: {}",
                backend_id, e
            ))),
            Err(_) => Err(FreshnessError::InferenceTimeout {
                backend: backend_id.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Health probe for every configured backend. Loads backends that are
    /// not loaded yet.
    pub async fn health_reports(&self) -> HashMap<String, HealthReport> {
        let registry = self.registry.clone();
        let ids = self.backend_ids();

        let probe = tokio::task::spawn_blocking(move || {
            ids.into_iter()
                .map(|id| {
                    let report = HealthReport::from(&registry.health(&id));
                    (id, report)
                })
                .collect::<HashMap<_, _>>()
        });

        match probe.await {
            Ok(reports) => reports,
            Err(e) => self
                .backend_ids()
                .into_iter()
                .map(|id| {
                    let health = BackendHealth::Degraded(format!("health probe failed: {}", e));
                    (id, HealthReport::from(&health))
                })
                .collect(),
        }
    }

    /// Release every loaded backend. Returns how many were released.
    pub fn shutdown(&self) -> usize {
        self.registry.shutdown()
    }
}
