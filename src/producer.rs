//! NATS message producer for verdicts and health replies

use crate::types::health::HealthReport;
use crate::types::request::VerdictEnvelope;
use anyhow::Result;
use async_nats::Client;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Producer for publishing verdict envelopes to NATS
#[derive(Clone)]
pub struct VerdictProducer {
    client: Client,
    subject: String,
}

impl VerdictProducer {
    /// Create a new verdict producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a verdict envelope
    pub async fn publish(&self, envelope: &VerdictEnvelope) -> Result<()> {
        let payload = serde_json::to_vec(envelope)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            envelope_id = %envelope.envelope_id,
            request_id = %envelope.request_id,
            backend = %envelope.backend_id,
            ok = envelope.is_ok(),
            "Published verdict"
        );

        Ok(())
    }

    /// Answer a health probe on its reply subject
    pub async fn reply_health(
        &self,
        reply: impl ToString,
        reports: &HashMap<String, HealthReport>,
    ) -> Result<()> {
        let payload = encode_health(reports)?;
        self.client.publish(reply.to_string(), payload.into()).await?;
        debug!(backends = reports.len(), "Answered health probe");
        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Health replies are keyed by backend id in sorted order
pub fn encode_health(reports: &HashMap<String, HealthReport>) -> Result<Vec<u8>> {
    let sorted: BTreeMap<&String, &HealthReport> = reports.iter().collect();
    Ok(serde_json::to_vec(&sorted)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::health::BackendHealth;

    #[test]
    fn test_encode_health() {
        let mut reports = HashMap::new();
        reports.insert("tflite".to_string(), HealthReport::from(&BackendHealth::Loaded));
        reports.insert(
            "roboflow".to_string(),
            HealthReport::from(&BackendHealth::Degraded(
                "ROBOFLOW_API_KEY is not set. Export the credential and retry.".to_string(),
            )),
        );

        let payload = encode_health(&reports).unwrap();
        let text = String::from_utf8(payload.clone()).unwrap();
        assert!(text.find("roboflow").unwrap() < text.find("tflite").unwrap());

        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "roboflow": {
                    "status": "degraded",
                    "model_loaded": false,
                    "message": "ROBOFLOW_API_KEY is not set. Export the credential and retry."
                },
                "tflite": {"status": "ok", "model_loaded": true}
            })
        );
    }
}
