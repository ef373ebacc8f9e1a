//! Prediction handler.
//!
//! Accepts raw applicant fields, re-derives the engineered features through
//! the shared transform, validates them against the model's feature spec,
//! and returns the thresholded prediction.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::context::ScoringContext;
use crate::error::AppResult;
use crate::features::RawRecord;
use crate::model::ScoreResult;

#[derive(Serialize)]
pub struct PredictResponse {
    pub prediction: ScoreResult,
}

pub async fn predict(
    State(ctx): State<Arc<ScoringContext>>,
    Json(raw): Json<RawRecord>,
) -> AppResult<Json<PredictResponse>> {
    let prediction = ctx.score_raw(&raw)?;

    tracing::info!(
        label = prediction.label,
        probability = prediction.probability,
        "prediction made"
    );

    Ok(Json(PredictResponse { prediction }))
}
