//! Environmental readings consumed by the tabular freshness classifier

use crate::error::{FreshnessError, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

const TEMPERATURE_RANGE: RangeInclusive<f64> = -10.0..=50.0;
const HUMIDITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;
const TIME_STORED_RANGE: RangeInclusive<f64> = 0.0..=168.0;
const GAS_RANGE: RangeInclusive<f64> = 0.0..=1000.0;

fn default_gas() -> f64 {
    200.0
}

/// Storage conditions of a food item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    /// Temperature (°C)
    pub temperature: f64,

    /// Relative humidity (%)
    pub humidity: f64,

    /// Storage time in hours
    pub time_stored_hours: f64,

    /// Gas concentration (optional sensor, defaults to 200)
    #[serde(default = "default_gas")]
    pub gas: f64,
}

impl EnvironmentReading {
    /// Create a reading with the default gas concentration
    pub fn new(temperature: f64, humidity: f64, time_stored_hours: f64) -> Self {
        Self {
            temperature,
            humidity,
            time_stored_hours,
            gas: default_gas(),
        }
    }

    pub fn with_gas(mut self, gas: f64) -> Self {
        self.gas = gas;
        self
    }

    /// Check every field against its sensor range.
    pub fn validate(&self) -> Result<()> {
        check_range("temperature", self.temperature, &TEMPERATURE_RANGE)?;
        check_range("humidity", self.humidity, &HUMIDITY_RANGE)?;
        check_range("time_stored_hours", self.time_stored_hours, &TIME_STORED_RANGE)?;
        check_range("gas", self.gas, &GAS_RANGE)
    }
}

fn check_range(field: &str, value: f64, range: &RangeInclusive<f64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(FreshnessError::InvalidInput(format!(
            "{} must be within {}..={}, got {}",
            field,
            range.start(),
            range.end(),
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_deserialization_defaults_gas() {
        let json = r#"{"temperature": 4.0, "humidity": 60.0, "time_stored_hours": 12.0}"#;
        let reading: EnvironmentReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.gas, 200.0);
        assert!(reading.validate().is_ok());
    }

    #[test]
    fn test_reading_bounds_are_inclusive() {
        assert!(EnvironmentReading::new(-10.0, 0.0, 0.0).validate().is_ok());
        assert!(EnvironmentReading::new(50.0, 100.0, 168.0)
            .with_gas(1000.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_reading_out_of_range() {
        let err = EnvironmentReading::new(51.0, 50.0, 10.0).validate().unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("temperature"));

        let err = EnvironmentReading::new(20.0, 50.0, 200.0).validate().unwrap_err();
        assert!(err.to_string().contains("time_stored_hours"));

        let err = EnvironmentReading::new(20.0, 50.0, 10.0)
            .with_gas(f64::NAN)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("gas"));
    }
}
