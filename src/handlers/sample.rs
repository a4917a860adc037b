//! Sample data handler

use axum::{extract::State, Json};

use crate::logic::features::SAMPLE_MEASUREMENTS;
use crate::models::SampleResponse;
use crate::AppState;

pub async fn get(State(state): State<AppState>) -> Json<SampleResponse> {
    Json(SampleResponse {
        measurements: SAMPLE_MEASUREMENTS.to_vec(),
        feature_names: state.service.feature_names().to_vec(),
        description: "Sample mandibular measurements for testing",
    })
}
