//! NATS message consumer for incoming evaluation requests

use crate::error::FreshnessError;
use crate::types::request::{EvaluationRequest, VerdictEnvelope};
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use serde_json::Value;
use tracing::info;

/// Consumer for receiving evaluation requests and health probes from NATS
pub struct RequestConsumer {
    client: Client,
    subject: String,
    health_subject: String,
}

impl RequestConsumer {
    /// Create a new request consumer
    pub fn new(client: Client, subject: &str, health_subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            health_subject: health_subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to request subject");
        Ok(subscriber)
    }

    /// Subscribe to the health probe subject
    pub async fn subscribe_health(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.health_subject.clone()).await?;
        info!(subject = %self.health_subject, "Subscribed to health subject");
        Ok(subscriber)
    }

    /// Get the request subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn health_subject(&self) -> &str {
        &self.health_subject
    }
}

/// Decode a request payload
pub fn decode_request(payload: &[u8]) -> Result<EvaluationRequest> {
    serde_json::from_slice(payload).context("Failed to deserialize evaluation request")
}

/// Build the `invalid_input` reply for a payload [`decode_request`] refused.
///
/// `request_id` and `backend_id` are echoed when the payload is a JSON
/// object carrying them as strings.
pub fn reject_payload(payload: &[u8], error: &anyhow::Error) -> VerdictEnvelope {
    let fields = serde_json::from_slice::<Value>(payload).ok();
    let field = |name: &str| {
        fields
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let err = FreshnessError::InvalidInput(format!("{:#}", error));
    VerdictEnvelope::rejected(&field("request_id"), &field("backend_id"), &err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::backend::{BackendInput, BackendResult};
    use crate::types::request::Outcome;

    fn rejection(payload: &[u8]) -> VerdictEnvelope {
        let err = decode_request(payload).unwrap_err();
        reject_payload(payload, &err)
    }

    fn category(envelope: &VerdictEnvelope) -> &str {
        match &envelope.outcome {
            Outcome::Error { category, .. } => category,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_decode_request() {
        let payload = br#"{
            "request_id": "req-1",
            "backend_id": "mobilenet",
            "input": {"type": "reported", "result": {"kind": "image_binary_regression", "score": 0.2}}
        }"#;

        let request = decode_request(payload).unwrap();
        assert_eq!(request.request_id, "req-1");
        assert_eq!(request.backend_id, "mobilenet");
        assert_eq!(
            request.input,
            BackendInput::Reported {
                result: BackendResult::ImageBinaryRegression { score: 0.2 }
            }
        );
    }

    #[test]
    fn test_decode_environment_request() {
        let payload = br#"{
            "request_id": "req-2",
            "backend_id": "env",
            "input": {"type": "environment", "temperature": 4.0, "humidity": 60.0, "time_stored_hours": 10.0}
        }"#;

        let request = decode_request(payload).unwrap();
        assert_eq!(request.input.type_name(), "environment");
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode_request(b"not json").is_err());
        assert!(decode_request(br#"{"request_id": "x"}"#).is_err());
    }

    #[test]
    fn test_rejected_payload_echoes_ids() {
        // Well-formed JSON with a confidence of the wrong type
        let payload = br#"{
            "request_id": "req-3",
            "backend_id": "freshvision",
            "input": {"type": "reported", "result": {"kind": "image_multiclass", "class_label": "fresh_apple", "confidence": "high"}}
        }"#;
        let envelope = rejection(payload);
        assert_eq!(envelope.request_id, "req-3");
        assert_eq!(envelope.backend_id, "freshvision");
        assert_eq!(category(&envelope), "invalid_input");

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["outcome"]["status"], "error");
        assert_eq!(json["outcome"]["category"], "invalid_input");
    }

    #[test]
    fn test_rejected_payload_unknown_input_type() {
        let payload = br#"{"request_id": "req-4", "backend_id": "env", "input": {"type": "audio"}}"#;
        let envelope = rejection(payload);
        assert_eq!(envelope.request_id, "req-4");
        assert_eq!(category(&envelope), "invalid_input");
    }

    #[test]
    fn test_rejected_payload_without_ids() {
        let envelope = rejection(b"not json");
        assert_eq!(envelope.request_id, "");
        assert_eq!(envelope.backend_id, "");
        assert_eq!(category(&envelope), "invalid_input");

        // Ids of the wrong type are not echoed
        let envelope = rejection(br#"{"request_id": 7, "backend_id": "env"}"#);
        assert_eq!(envelope.request_id, "");
        assert_eq!(envelope.backend_id, "env");
    }
}
