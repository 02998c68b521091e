//! Backend health reporting

use serde::{Deserialize, Serialize};

/// Load state of a backend as tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendHealth {
    Loaded,
    Degraded(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Health probe payload for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model_loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&BackendHealth> for HealthReport {
    fn from(health: &BackendHealth) -> Self {
        match health {
            BackendHealth::Loaded => HealthReport {
                status: HealthStatus::Ok,
                model_loaded: true,
                message: None,
            },
            BackendHealth::Degraded(reason) => HealthReport {
                status: HealthStatus::Degraded,
                model_loaded: false,
                message: Some(reason.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_report_json() {
        let report = HealthReport::from(&BackendHealth::Loaded);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"status": "ok", "model_loaded": true})
        );

        let report = HealthReport::from(&BackendHealth::Degraded("model not found".to_string()));
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "status": "degraded",
                "model_loaded": false,
                "message": "model not found"
            })
        );
    }
}
