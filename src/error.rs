//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Failures on the request-scoped scoring path (derive -> validate -> score).
///
/// Every variant is a terminal outcome for a single request; none of them
/// corrupts shared state and none is retried.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// A raw field held a non-numeric or non-finite value.
    #[error("malformed value for `{field}`: {reason}")]
    MalformedInput { field: String, reason: String },

    /// The engineered record lacks features the model expects.
    #[error("missing features after preprocessing: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// The engineered record carries features the model does not know.
    #[error("unexpected features after preprocessing: {}", .0.join(", "))]
    UnexpectedFeatures(Vec<String>),

    /// The underlying model call failed.
    #[error("prediction failed: {0}")]
    Prediction(String),
}

/// Fatal startup failures. The process must not serve in this state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load model from `{path}`: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("failed to load metadata from `{path}`: {reason}")]
    MetadataLoad { path: String, reason: String },

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

/// Failures in the offline batch run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("row {row} of `{table}`: {source}")]
    Row {
        table: String,
        row: usize,
        source: ScoreError,
    },

    #[error("table `{0}` is empty")]
    EmptyTable(String),
}

/// HTTP-facing wrapper around [`ScoreError`].
#[derive(Debug)]
pub struct AppError(pub ScoreError);

impl From<ScoreError> for AppError {
    fn from(err: ScoreError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            ScoreError::MalformedInput { .. } => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ScoreError::MissingFeatures(_) | ScoreError::UnexpectedFeatures(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            ScoreError::Prediction(msg) => {
                // Model internals stay server-side; the client gets an opaque failure.
                tracing::error!("prediction error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction failed.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": detail,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
