//! Scorer - wraps the trained classifier.
//!
//! The classifier is loaded once at startup and treated as read-only; a
//! failing model call is fatal to that single request only. Thresholding
//! uses `>=` semantics: a probability exactly on the threshold is high-risk.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{ScoreError, StartupError};

/// Probability plus thresholded binary label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    pub label: u8,
    pub probability: f64,
}

/// Positive-class probability estimation over an ordered feature vector.
///
/// Abstracted behind a trait so tests can stub the model out; the production
/// implementation is [`OnnxClassifier`].
pub trait Classifier: Send + Sync {
    fn predict_probability(&self, features: &[f64]) -> Result<f64, ScoreError>;
}

/// ONNX Runtime backed classifier.
///
/// `ort` sessions need exclusive access to run, so the session sits behind a
/// mutex; the model weights themselves are never mutated.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    /// Load the model artifact from disk. Failure here must abort startup.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let model_load = |reason: String| StartupError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            return Err(model_load("file not found".to_string()));
        }

        let session = Session::builder()
            .map_err(|e| model_load(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| model_load(format!("failed to set optimization: {e}")))?
            .commit_from_file(path)
            .map_err(|e| model_load(format!("failed to load model: {e}")))?;

        tracing::info!(path = %path.display(), "ONNX model loaded");

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_probability(&self, features: &[f64]) -> Result<f64, ScoreError> {
        let prediction = |msg: String| ScoreError::Prediction(msg);

        let input: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input_array = Array2::<f32>::from_shape_vec((1, input.len()), input)
            .map_err(|e| prediction(format!("array error: {e}")))?;

        let mut session = self.session.lock();

        // Converted gradient-boosting models expose the class labels first
        // and the probability tensor as the final output.
        let output_name = session
            .outputs()
            .last()
            .map(|o| o.name().to_string())
            .ok_or_else(|| prediction("model has no outputs".to_string()))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| prediction(format!("tensor error: {e}")))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| prediction(format!("inference failed: {e}")))?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| prediction(format!("missing output `{output_name}`")))?;

        let output_tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| prediction(format!("extract error: {e}")))?;

        let data = output_tensor.1;
        // Binary classifiers emit [p(neg), p(pos)] per row; a single-logit
        // model emits the positive probability directly.
        let probability = match data {
            [] => return Err(prediction("empty probability tensor".to_string())),
            [p] => f64::from(*p),
            _ => f64::from(data[data.len() - 1]),
        };

        Ok(probability)
    }
}

/// Threshold the classifier's probability into a label. Ties go positive.
pub fn score(
    classifier: &dyn Classifier,
    vector: &[f64],
    threshold: f64,
) -> Result<ScoreResult, ScoreError> {
    let probability = classifier.predict_probability(vector)?;

    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(ScoreError::Prediction(format!(
            "probability {probability} outside [0, 1]"
        )));
    }

    Ok(ScoreResult {
        label: u8::from(probability >= threshold),
        probability,
    })
}
