//! End-to-end: config file -> engine -> verdict envelope

use freshness_pipeline::consumer::{decode_request, reject_payload};
use freshness_pipeline::types::{Classification, HealthStatus, Outcome, VerdictEnvelope};
use freshness_pipeline::{AppConfig, InferenceEngine};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const CREDENTIAL_VAR: &str = "FRESHNESS_PIPELINE_IT_API_KEY";

fn write_file(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path.display().to_string()
}

fn pipeline_config(dir: &TempDir) -> AppConfig {
    let artifact = NamedTempFile::new_in(dir.path()).unwrap();
    let (_, artifact_path) = artifact.keep().unwrap();

    let nutrition_path = write_file(
        dir,
        "nutrition.toml",
        r#"
[apple]
protein_g = 0.3
carbohydrates_g = 13.8

["bitter gourd"]
protein_g = 1.0
"#,
    );

    let config_path = write_file(
        dir,
        "config.toml",
        &format!(
            r#"
[nats]
url = "nats://localhost:4222"
request_subject = "freshness.requests"
verdict_subject = "freshness.verdicts"
health_subject = "freshness.health"

[normalization]
fresh_threshold = 0.10
medium_threshold = 0.35

[pipeline]
workers = 2
timeout_ms = 2000

[logging]
level = "debug"
format = "pretty"

[nutrition]
table_path = "{nutrition}"

[backends.env]
kind = "tabular_classifier"

[backends.tflite]
kind = "image_multiclass"
artifact_path = "{artifact}"
label_set = "tflite_produce"

[backends.mobilenet]
kind = "image_binary_regression"
score_direction = "higher_is_fresher"

[backends.missing]
kind = "image_multiclass"
artifact_path = "{missing}"

[backends.primary]
kind = "image_multiclass"
artifact_path = "{missing}"
fallback = ["missing", "tflite"]

[backends.roboflow]
kind = "object_detection"
credential_env = "{credential}"
"#,
            nutrition = nutrition_path,
            artifact = artifact_path.display(),
            missing = dir.path().join("absent.pt").display(),
            credential = CREDENTIAL_VAR,
        ),
    );

    let config = AppConfig::load_from_path(&config_path).unwrap();
    config.validate().unwrap();
    config
}

async fn evaluate(engine: &InferenceEngine, payload: &str) -> VerdictEnvelope {
    let request = match decode_request(payload.as_bytes()) {
        Ok(request) => request,
        Err(e) => return reject_payload(payload.as_bytes(), &e),
    };
    match engine
        .evaluate_with_fallback(&request.backend_id, request.input.clone())
        .await
    {
        Ok(prediction) => VerdictEnvelope::new(&request, &Ok(prediction.verdict))
            .with_assessment(prediction.assessment),
        Err(e) => VerdictEnvelope::new(&request, &Err(e)),
    }
}

#[tokio::test]
async fn test_pipeline_end_to_end() {
    std::env::set_var(CREDENTIAL_VAR, "test-key");

    let dir = TempDir::new().unwrap();
    let config = pipeline_config(&dir);
    let engine = InferenceEngine::new(&config).unwrap();
    assert_eq!(engine.backend_count(), 6);

    // Environmental reading through the in-process tabular backend
    let envelope = evaluate(
        &engine,
        r#"{"request_id": "r1", "backend_id": "env",
            "input": {"type": "environment", "temperature": 30.0, "humidity": 70.0, "time_stored_hours": 36.0}}"#,
    )
    .await;
    match &envelope.outcome {
        Outcome::Ok { verdict } => {
            assert_eq!(verdict.classification, Classification::Stale);
            assert_eq!(verdict.freshness_index, 55);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    // Probability vector decoded with the produce label set, enriched with nutrition
    let mut probabilities = vec![0.01f32; 12];
    probabilities[5] = 0.75; // stale_bitter_gourd
    let payload = serde_json::json!({
        "request_id": "r2",
        "backend_id": "tflite",
        "input": {"type": "probabilities", "probabilities": probabilities}
    })
    .to_string();
    let envelope = evaluate(&engine, &payload).await;
    match &envelope.outcome {
        Outcome::Ok { verdict } => {
            assert_eq!(verdict.classification, Classification::Stale);
            assert_eq!(verdict.freshness_index, 25);
            assert_eq!(verdict.item_type.as_deref(), Some("bitter_gourd"));
            assert_eq!(verdict.nutrition.as_ref().and_then(|n| n.protein_g), Some(1.0));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    // Higher-is-fresher regressor
    let envelope = evaluate(
        &engine,
        r#"{"request_id": "r3", "backend_id": "mobilenet",
            "input": {"type": "reported", "result": {"kind": "image_binary_regression", "score": 0.8}}}"#,
    )
    .await;
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["request_id"], "r3");
    assert_eq!(json["outcome"]["status"], "ok");
    assert_eq!(json["outcome"]["verdict"]["classification"], "medium_fresh");
    assert_eq!(json["outcome"]["verdict"]["freshness_index"], 80);

    // Detector output
    let envelope = evaluate(
        &engine,
        r#"{"request_id": "r4", "backend_id": "roboflow",
            "input": {"type": "reported", "result": {"kind": "object_detection", "detections": [
                {"class": "fresh_apple", "confidence": 0.9},
                {"class": "rotten_banana", "confidence": 0.6}
            ]}}}"#,
    )
    .await;
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["outcome"]["verdict"]["classification"], "rotten");
    assert_eq!(json["outcome"]["verdict"]["freshness_index"], 36);
    assert_eq!(json["assessment"]["grade"], "poor");
    assert_eq!(json["assessment"]["status"], "rejected");

    // Unavailable primary falls through to the produce classifier
    let envelope = evaluate(
        &engine,
        r#"{"request_id": "r6", "backend_id": "primary",
            "input": {"type": "reported", "result": {"kind": "image_multiclass", "class_label": "fresh-banana", "confidence": 0.88}}}"#,
    )
    .await;
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["backend_id"], "primary");
    assert_eq!(json["outcome"]["verdict"]["classification"], "fresh");
    assert_eq!(json["outcome"]["verdict"]["freshness_index"], 88);
    assert_eq!(json["assessment"]["backend_id"], "tflite");
    assert_eq!(json["assessment"]["grade"], "excellent");
    assert_eq!(json["assessment"]["status"], "approved");

    // Undecodable input still gets a reply
    let envelope = evaluate(
        &engine,
        r#"{"request_id": "r7", "backend_id": "mobilenet",
            "input": {"type": "reported", "result": {"kind": "image_binary_regression", "score": "low"}}}"#,
    )
    .await;
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["request_id"], "r7");
    assert_eq!(json["backend_id"], "mobilenet");
    assert_eq!(json["outcome"]["category"], "invalid_input");

    // Missing artifact surfaces as an error envelope
    let envelope = evaluate(
        &engine,
        r#"{"request_id": "r5", "backend_id": "missing",
            "input": {"type": "reported", "result": {"kind": "image_multiclass", "class_label": "fresh_apple", "confidence": 0.9}}}"#,
    )
    .await;
    assert!(!envelope.is_ok());
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["outcome"]["status"], "error");
    assert_eq!(json["outcome"]["category"], "model_unavailable");

    let reports = engine.health_reports().await;
    assert_eq!(reports.len(), 6);
    assert_eq!(reports["missing"].status, HealthStatus::Degraded);
    assert_eq!(reports["primary"].status, HealthStatus::Degraded);
    for id in ["env", "tflite", "mobilenet", "roboflow"] {
        assert_eq!(reports[id].status, HealthStatus::Ok, "backend {}", id);
    }

    assert_eq!(engine.shutdown(), 4);
    std::env::remove_var(CREDENTIAL_VAR);
}
