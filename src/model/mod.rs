//! Model module - trained-model metadata, schema validation, and scoring.

pub mod metadata;
pub mod scorer;
pub mod validate;

pub use metadata::FeatureSpec;
pub use scorer::{score, Classifier, OnnxClassifier, ScoreResult};
pub use validate::validate;
