//! Standard scaler exported from training as JSON
//!
//! ```json
//! { "mean": [..], "scale": [..], "feature_names": ["Time", "V1", ..] }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::{ArtifactError, Scaler};

#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

impl StandardScaler {
    #[cfg(test)]
    pub fn new(mean: Vec<f64>, scale: Vec<f64>, feature_names: Option<Vec<String>>) -> Result<Self, ArtifactError> {
        let scaler = Self { mean, scale, feature_names };
        scaler.check()?;
        Ok(scaler)
    }

    /// Load scaler parameters from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ArtifactError::Load(format!("Failed to read scaler: {}", e)))?;

        let scaler: StandardScaler = serde_json::from_str(&content)
            .map_err(|e| ArtifactError::Load(format!("Failed to parse scaler: {}", e)))?;

        scaler.check()?;
        Ok(scaler)
    }

    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    fn check(&self) -> Result<(), ArtifactError> {
        if self.mean.is_empty() || self.mean.len() != self.scale.len() {
            return Err(ArtifactError::Load(format!(
                "scaler has {} means and {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.mean.len() {
                return Err(ArtifactError::Load(format!(
                    "scaler has {} feature names for {} columns",
                    names.len(),
                    self.mean.len()
                )));
            }
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, features: &[f64], feature_names: &[String]) -> Result<Vec<f32>, ArtifactError> {
        if features.len() != self.mean.len() {
            return Err(ArtifactError::DimensionMismatch {
                expected: self.mean.len(),
                actual: features.len(),
            });
        }

        if let Some(expected) = &self.feature_names {
            if let Some((want, got)) = expected
                .iter()
                .zip(feature_names)
                .find(|(want, got)| want != got)
            {
                return Err(ArtifactError::FeatureNames(format!(
                    "expected '{}', got '{}'",
                    want, got
                )));
            }
        }

        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .enumerate()
            .map(|(i, (&x, (&mean, &scale)))| {
                // sklearn stores a unit scale for constant columns
                let scale = if scale == 0.0 { 1.0 } else { scale };
                let scaled = ((x - mean) / scale) as f32;
                if scaled.is_finite() {
                    Ok(scaled)
                } else {
                    let name = feature_names.get(i).map(String::as_str).unwrap_or("?");
                    Err(ArtifactError::NonFinite(format!("feature '{}' = {}", name, x)))
                }
            })
            .collect()
    }
}
