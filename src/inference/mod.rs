//! Model artifacts - scaler, classifier and attribution engine
//!
//! The trained artifacts are external. This module only adapts them behind
//! small traits so the request path can run against ONNX Runtime in
//! production and against in-memory fakes in tests.

pub mod attribution;
pub mod classifier;
pub mod scaler;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::ArtifactConfig;

pub use attribution::OnnxAttribution;
pub use classifier::OnnxClassifier;
pub use scaler::StandardScaler;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("failed to load artifact: {0}")]
    Load(String),

    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("feature names do not match training columns: {0}")]
    FeatureNames(String),

    #[error("scaled value out of range: {0}")]
    NonFinite(String),

    #[error("inference failed: {0}")]
    Runtime(String),
}

/// Feature-scaling transform fit at training time
pub trait Scaler: Send + Sync {
    fn transform(&self, features: &[f64], feature_names: &[String]) -> Result<Vec<f32>, ArtifactError>;
}

/// Fraud classifier over a scaled feature row
pub trait Classifier: Send + Sync {
    /// Probability of the fraud class, or the raw prediction when the model
    /// has no probabilistic output.
    fn predict(&self, scaled: &[f32]) -> Result<f64, ArtifactError>;
}

/// Per-feature contributions for a scaled instance
pub trait AttributionEngine: Send + Sync {
    fn attributions(&self, scaled: &[f32]) -> Result<Vec<f64>, ArtifactError>;
}

/// Output of a single scoring pass
#[derive(Debug, Clone)]
pub struct Scored {
    pub fraud_probability: f64,
    /// `None` when no attribution engine is loaded or it failed
    pub attributions: Option<Vec<f64>>,
}

/// Loaded artifacts, immutable after startup
pub struct ModelArtifacts {
    scaler: Arc<dyn Scaler>,
    classifier: Arc<dyn Classifier>,
    attribution: Option<Arc<dyn AttributionEngine>>,
    model_name: String,
    loaded_at: DateTime<Utc>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

/// Engine status for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub model_name: String,
    pub attribution_loaded: bool,
    pub inference_device: String,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
    pub loaded_at: DateTime<Utc>,
}

impl ModelArtifacts {
    pub fn new(
        scaler: Arc<dyn Scaler>,
        classifier: Arc<dyn Classifier>,
        attribution: Option<Arc<dyn AttributionEngine>>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            scaler,
            classifier,
            attribution,
            model_name: model_name.into(),
            loaded_at: Utc::now(),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Load every artifact from disk.
    ///
    /// The scaler and classifier are required. A missing or broken attribution
    /// model only disables attributions.
    pub fn load(config: &ArtifactConfig) -> Result<Self, ArtifactError> {
        let scaler = StandardScaler::from_file(&config.scaler_path)?;
        tracing::info!(
            path = %config.scaler_path,
            features = scaler.feature_count(),
            "Scaler loaded"
        );

        let classifier = OnnxClassifier::load(&config.model_path)?;

        // dry run on a zero row, output layout problems surface at startup
        classifier
            .predict(&vec![0.0; scaler.feature_count()])
            .map_err(|e| ArtifactError::Load(format!("classifier check failed: {}", e)))?;

        let attribution: Option<Arc<dyn AttributionEngine>> =
            if Path::new(&config.explainer_path).exists() {
                match OnnxAttribution::load(&config.explainer_path) {
                    Ok(engine) => Some(Arc::new(engine)),
                    Err(e) => {
                        tracing::warn!("Attribution engine unavailable ({}), serving zero attributions", e);
                        None
                    }
                }
            } else {
                tracing::warn!(
                    path = %config.explainer_path,
                    "No attribution model found, serving zero attributions"
                );
                None
            };

        Ok(Self::new(
            Arc::new(scaler),
            Arc::new(classifier),
            attribution,
            config.model_path.clone(),
        ))
    }

    pub fn has_attribution(&self) -> bool {
        self.attribution.is_some()
    }

    /// Scale, classify and attribute a single transaction
    pub fn score(&self, features: &[f64], feature_names: &[String]) -> Result<Scored, ArtifactError> {
        let start_time = std::time::Instant::now();

        let scaled = self.scaler.transform(features, feature_names)?;
        let fraud_probability = self.classifier.predict(&scaled)?;

        let attributions = self.attribution.as_ref().and_then(|engine| {
            match engine.attributions(&scaled) {
                Ok(values) => Some(values),
                Err(e) => {
                    tracing::warn!("Attribution failed ({}), using zero attributions", e);
                    None
                }
            }
        });

        let elapsed = start_time.elapsed().as_micros() as u64;
        self.latency_sum_us.fetch_add(elapsed, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            fraud_probability,
            inference_time_us = elapsed,
            "Transaction scored"
        );

        Ok(Scored {
            fraud_probability,
            attributions,
        })
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_name: self.model_name.clone(),
            attribution_loaded: self.has_attribution(),
            inference_device: "ONNX Runtime (CPU)".to_string(),
            avg_latency_ms: avg,
            inference_count: count,
            loaded_at: self.loaded_at,
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory artifacts for handler and agent tests

    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Identity scaler that checks the feature count
    pub struct PassthroughScaler {
        pub expected: usize,
    }

    impl Scaler for PassthroughScaler {
        fn transform(&self, features: &[f64], _names: &[String]) -> Result<Vec<f32>, ArtifactError> {
            if features.len() != self.expected {
                return Err(ArtifactError::DimensionMismatch {
                    expected: self.expected,
                    actual: features.len(),
                });
            }
            Ok(features.iter().map(|&v| v as f32).collect())
        }
    }

    /// Returns a fixed probability and counts invocations
    pub struct FixedClassifier {
        pub probability: f64,
        pub calls: AtomicUsize,
    }

    impl FixedClassifier {
        pub fn new(probability: f64) -> Self {
            Self { probability, calls: AtomicUsize::new(0) }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for FixedClassifier {
        fn predict(&self, _scaled: &[f32]) -> Result<f64, ArtifactError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probability)
        }
    }

    /// Attributions equal to the scaled input
    pub struct EchoAttribution;

    impl AttributionEngine for EchoAttribution {
        fn attributions(&self, scaled: &[f32]) -> Result<Vec<f64>, ArtifactError> {
            Ok(scaled.iter().map(|&v| v as f64).collect())
        }
    }

    pub struct BrokenAttribution;

    impl AttributionEngine for BrokenAttribution {
        fn attributions(&self, _scaled: &[f32]) -> Result<Vec<f64>, ArtifactError> {
            Err(ArtifactError::Runtime("explainer crashed".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("V{}", i)).collect()
    }

    #[test]
    fn score_without_attribution_engine() {
        let artifacts = ModelArtifacts::new(
            Arc::new(PassthroughScaler { expected: 3 }),
            Arc::new(FixedClassifier::new(0.25)),
            None,
            "fake",
        );

        let scored = artifacts.score(&[1.0, 2.0, 3.0], &names(3)).unwrap();
        assert_eq!(scored.fraud_probability, 0.25);
        assert!(scored.attributions.is_none());
        assert_eq!(artifacts.status().inference_count, 1);
        assert!(!artifacts.status().attribution_loaded);
    }

    #[test]
    fn failing_attribution_degrades_to_none() {
        let artifacts = ModelArtifacts::new(
            Arc::new(PassthroughScaler { expected: 2 }),
            Arc::new(FixedClassifier::new(0.9)),
            Some(Arc::new(BrokenAttribution)),
            "fake",
        );

        let scored = artifacts.score(&[1.0, -1.0], &names(2)).unwrap();
        assert_eq!(scored.fraud_probability, 0.9);
        assert!(scored.attributions.is_none());
    }

    #[test]
    fn scaler_error_stops_before_classifier() {
        let classifier = Arc::new(FixedClassifier::new(0.5));
        let artifacts = ModelArtifacts::new(
            Arc::new(PassthroughScaler { expected: 4 }),
            classifier.clone(),
            Some(Arc::new(EchoAttribution)),
            "fake",
        );

        let err = artifacts.score(&[1.0], &names(1)).unwrap_err();
        assert!(matches!(err, ArtifactError::DimensionMismatch { expected: 4, actual: 1 }));
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn load_fails_without_scaler() {
        let config = ArtifactConfig {
            model_path: "/nonexistent/model.onnx".to_string(),
            scaler_path: "/nonexistent/scaler.json".to_string(),
            explainer_path: "/nonexistent/explainer.onnx".to_string(),
        };
        assert!(matches!(ModelArtifacts::load(&config), Err(ArtifactError::NotFound(_))));
    }
}
