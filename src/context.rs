//! Immutable scoring context.
//!
//! Model and metadata are loaded exactly once, before the process accepts
//! work; after that the context is shared read-only across all requests.
//! Replacing the model means constructing a new context, never mutating
//! this one, so a spec/model pair can only ever change atomically.

use std::path::Path;

use crate::config::Config;
use crate::error::{ScoreError, StartupError};
use crate::features::{derive, RawRecord};
use crate::model::{score, validate, Classifier, FeatureSpec, OnnxClassifier, ScoreResult};

pub struct ScoringContext {
    pub spec: FeatureSpec,
    classifier: Box<dyn Classifier>,
}

impl ScoringContext {
    pub fn new(spec: FeatureSpec, classifier: Box<dyn Classifier>) -> Self {
        Self { spec, classifier }
    }

    /// Load model and metadata per config. Any failure is fatal to startup.
    pub fn load(config: &Config) -> Result<Self, StartupError> {
        let classifier = OnnxClassifier::load(Path::new(&config.model_path))?;
        let spec = FeatureSpec::load(Path::new(&config.metadata_path))?;

        tracing::info!(
            features = spec.features.len(),
            threshold = spec.threshold,
            "scoring context ready"
        );

        Ok(Self::new(spec, Box::new(classifier)))
    }

    /// The full request-scoped flow: raw -> derive -> validate -> score.
    pub fn score_raw(&self, raw: &RawRecord) -> Result<ScoreResult, ScoreError> {
        let engineered = derive(raw, None)?;
        let vector = validate(&engineered, &self.spec)?;
        score(self.classifier.as_ref(), &vector, self.spec.threshold)
    }

    /// Score an already validated, spec-ordered vector (batch path).
    pub fn score_vector(&self, vector: &[f64]) -> Result<ScoreResult, ScoreError> {
        score(self.classifier.as_ref(), vector, self.spec.threshold)
    }
}
