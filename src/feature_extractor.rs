//! Feature extraction for the environmental freshness classifier.
//!
//! Produces the feature vector in the column order the tabular model was
//! trained on.

use crate::error::Result;
use crate::types::reading::EnvironmentReading;

const FEATURE_NAMES: [&str; 4] = ["Temperature", "Humidity", "Time", "Gas"];

/// Feature extractor that turns validated readings into model input.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a reading.
    ///
    /// Order: temperature, humidity, time stored (hours), gas.
    pub fn extract(&self, reading: &EnvironmentReading) -> Vec<f32> {
        vec![
            reading.temperature as f32,
            reading.humidity as f32,
            reading.time_stored_hours as f32,
            reading.gas as f32,
        ]
    }

    /// Validate the reading, then extract its features.
    pub fn extract_checked(&self, reading: &EnvironmentReading) -> Result<Vec<f32>> {
        reading.validate()?;
        Ok(self.extract(reading))
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names (matching training column order).
    pub fn feature_names(&self) -> Vec<&'static str> {
        FEATURE_NAMES.to_vec()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::new();
        let reading = EnvironmentReading::new(4.0, 65.0, 12.0).with_gas(150.0);

        let features = extractor.extract(&reading);

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(features, vec![4.0, 65.0, 12.0, 150.0]);
    }

    #[test]
    fn test_default_gas_feature() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&EnvironmentReading::new(20.0, 50.0, 30.0));
        assert_eq!(features[3], 200.0);
    }

    #[test]
    fn test_checked_extraction_rejects_out_of_range() {
        let extractor = FeatureExtractor::new();
        let err = extractor
            .extract_checked(&EnvironmentReading::new(20.0, 50.0, 200.0))
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("time_stored_hours"));
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), 4);
        assert_eq!(extractor.feature_names(), vec!["Temperature", "Humidity", "Time", "Gas"]);
    }
}
