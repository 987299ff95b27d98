//! ONNX attribution engine
//!
//! Runs an exported explainer graph that maps a scaled row to per-feature
//! contributions for the fraud class.

use std::path::Path;

use ndarray::{ArrayView2, ArrayView3, Axis};
use ort::session::Session;
use parking_lot::Mutex;

use super::classifier::{open_session, row_tensor};
use super::{ArtifactError, AttributionEngine};

pub struct OnnxAttribution {
    session: Mutex<Session>,
    input_name: String,
}

impl OnnxAttribution {
    pub fn load(explainer_path: &str) -> Result<Self, ArtifactError> {
        tracing::info!("Loading ONNX attribution model from: {}", explainer_path);

        if !Path::new(explainer_path).exists() {
            return Err(ArtifactError::NotFound(explainer_path.to_string()));
        }

        let session = open_session(explainer_path)?;
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }
}

impl AttributionEngine for OnnxAttribution {
    fn attributions(&self, scaled: &[f32]) -> Result<Vec<f64>, ArtifactError> {
        let input = row_tensor(scaled)?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ArtifactError::Runtime(format!("Attribution failed: {}", e)))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| ArtifactError::Runtime("No output defined".to_string()))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ArtifactError::Runtime(format!("Extract error: {}", e)))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();

        positive_class_contributions(&dims, data)
    }
}

/// Flatten explainer output to one contribution per feature.
///
/// Accepted layouts:
/// - `[n]` or `[1, n]`: contributions already for the fraud class
/// - `[classes, n]`: one row per class, row 1 is the fraud class
/// - `[1, n, classes]`: sample, feature, class
/// - `[classes, 1, n]`: class, sample, feature
pub fn positive_class_contributions(dims: &[usize], data: &[f32]) -> Result<Vec<f64>, ArtifactError> {
    let shape_err = |e: ndarray::ShapeError| ArtifactError::Runtime(format!("Array error: {}", e));

    let row = match *dims {
        [_] => data.to_vec(),
        [1, n] => data[..n.min(data.len())].to_vec(),
        [rows, n] if rows >= 2 => {
            let view = ArrayView2::from_shape((rows, n), data).map_err(shape_err)?;
            view.index_axis(Axis(0), 1).to_vec()
        }
        [1, _, classes] if classes >= 2 => {
            let view = ArrayView3::from_shape((dims[0], dims[1], classes), data).map_err(shape_err)?;
            view.index_axis(Axis(0), 0).index_axis(Axis(1), 1).to_vec()
        }
        [classes, 1, _] if classes >= 2 => {
            let view = ArrayView3::from_shape((classes, dims[1], dims[2]), data).map_err(shape_err)?;
            view.index_axis(Axis(0), 1).index_axis(Axis(0), 0).to_vec()
        }
        _ => {
            return Err(ArtifactError::Runtime(format!(
                "unsupported attribution shape {:?}",
                dims
            )))
        }
    };

    Ok(row.into_iter().map(f64::from).collect())
}
