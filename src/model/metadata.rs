//! Trained-model metadata.
//!
//! The training run exports a JSON document next to the model artifact:
//! `{"threshold": 0.37, "features": ["age", ...]}`. Feature order in that
//! list is load-bearing; the classifier consumes a positional vector.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::StartupError;

/// Canonical ordered feature list plus the decision threshold, immutable for
/// the lifetime of the loaded model.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeatureSpec {
    pub threshold: f64,
    pub features: Vec<String>,
}

impl FeatureSpec {
    /// Load and validate the metadata artifact. Any failure here is fatal:
    /// the process must not score without a trustworthy spec.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let raw = fs::read_to_string(path).map_err(|e| StartupError::MetadataLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let spec: FeatureSpec =
            serde_json::from_str(&raw).map_err(|e| StartupError::MetadataLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), StartupError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(StartupError::InvalidMetadata(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        if self.features.is_empty() {
            return Err(StartupError::InvalidMetadata(
                "empty feature list".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in &self.features {
            if !seen.insert(name.as_str()) {
                return Err(StartupError::InvalidMetadata(format!(
                    "duplicate feature `{name}`"
                )));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_tests(threshold: f64, features: &[&str]) -> Self {
        Self {
            threshold,
            features: features.iter().map(|s| s.to_string()).collect(),
        }
    }
}
