//! Prediction handler

use axum::{body::Bytes, extract::State, Json};

use crate::models::PredictionResponse;
use crate::{AppResult, AppState};

/// Predict sex from a `{"measurements": [...]}` body.
///
/// A body that is not JSON is rejected as missing measurements.
pub async fn predict(State(state): State<AppState>, body: Bytes) -> AppResult<Json<PredictionResponse>> {
    let prediction = state.service.predict_body(&body)?;

    let explanation = state
        .explainer
        .explain(&prediction, state.service.model_summary())
        .await;

    Ok(Json(PredictionResponse::new(
        prediction,
        explanation,
        state.service.feature_names(),
    )))
}
