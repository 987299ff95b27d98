//! ONNX classifier
//!
//! Expects a tabular export with a single `[1, n]` float input. Probabilistic
//! models expose a `probabilities` tensor next to the `label` output; label-only
//! models fall back to the raw prediction.

use std::path::Path;

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;

use super::{ArtifactError, Classifier};

pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    probability_output: Option<String>,
}

impl OnnxClassifier {
    /// Load ONNX model from file
    pub fn load(model_path: &str) -> Result<Self, ArtifactError> {
        tracing::info!("Loading ONNX classifier from: {}", model_path);

        if !Path::new(model_path).exists() {
            return Err(ArtifactError::NotFound(model_path.to_string()));
        }

        let session = open_session(model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        tracing::info!(
            input = %input_name,
            probabilities = ?probability_output,
            "ONNX classifier loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            probability_output,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, scaled: &[f32]) -> Result<f64, ArtifactError> {
        let input = row_tensor(scaled)?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ArtifactError::Runtime(format!("Inference failed: {}", e)))?;

        let values: Vec<(String, OutputValue)> = outputs
            .iter()
            .map(|(name, output)| {
                let value = if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                    OutputValue::Float {
                        dims: shape.iter().copied().collect(),
                        data: data.to_vec(),
                    }
                } else if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
                    OutputValue::Labels(labels.to_vec())
                } else {
                    OutputValue::Unsupported
                };
                (name.to_string(), value)
            })
            .collect();

        select_prediction(self.probability_output.as_deref(), &values)
    }
}

/// Classifier output copied out of the session
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Float { dims: Vec<i64>, data: Vec<f32> },
    Labels(Vec<i64>),
    /// Sequences, maps and other non-tensor values
    Unsupported,
}

/// Turn the session outputs into a fraud score.
///
/// A named probability output must be a float tensor. Without one, the first
/// float output is used, then the first label.
pub fn select_prediction(
    probability_output: Option<&str>,
    outputs: &[(String, OutputValue)],
) -> Result<f64, ArtifactError> {
    if let Some(wanted) = probability_output {
        return match outputs.iter().find(|(name, _)| name == wanted) {
            Some((_, OutputValue::Float { dims, data })) => Ok(positive_class_probability(dims, data)),
            Some(_) => Err(ArtifactError::Runtime(format!(
                "probability output '{}' is not a float tensor, re-export the model without zipmap",
                wanted
            ))),
            None => Err(ArtifactError::Runtime(format!(
                "probability output '{}' missing from results",
                wanted
            ))),
        };
    }

    if let Some((name, dims, data)) = outputs.iter().find_map(|(name, value)| match value {
        OutputValue::Float { dims, data } => Some((name, dims, data)),
        _ => None,
    }) {
        tracing::debug!(output = %name, "Using float output as prediction");
        return Ok(positive_class_probability(dims, data));
    }

    if let Some((name, label)) = outputs.iter().find_map(|(name, value)| match value {
        OutputValue::Labels(labels) => labels.first().map(|l| (name, *l)),
        _ => None,
    }) {
        tracing::debug!(output = %name, "Using label output as prediction");
        return Ok(label as f64);
    }

    Err(ArtifactError::Runtime("model produced no usable output".to_string()))
}

pub(super) fn open_session(model_path: &str) -> Result<Session, ArtifactError> {
    Session::builder()
        .map_err(|e| ArtifactError::Load(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| ArtifactError::Load(format!("Failed to set optimization: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| ArtifactError::Load(format!("Failed to load model: {}", e)))
}

/// Build a `[1, n]` input tensor
pub(super) fn row_tensor(scaled: &[f32]) -> Result<Tensor<f32>, ArtifactError> {
    let shape = vec![1_i64, scaled.len() as i64];
    Tensor::from_array((shape, scaled.to_vec()))
        .map_err(|e| ArtifactError::Runtime(format!("Tensor error: {}", e)))
}

/// Pick the fraud-class probability out of a classifier output
pub fn positive_class_probability(dims: &[i64], data: &[f32]) -> f64 {
    let classes = match dims {
        [_, classes] => *classes,
        [classes] => *classes,
        _ => 0,
    };

    match classes {
        c if c >= 2 => data.get(1).copied().unwrap_or(0.0) as f64,
        1 => data.first().copied().unwrap_or(0.0) as f64,
        _ => data.last().map(|&v| v as f64).unwrap_or(0.0),
    }
}
