//! Feature list handler

use axum::{extract::State, Json};

use crate::models::FeaturesResponse;
use crate::AppState;

/// Ordered names of the 15 measurements
pub async fn list(State(state): State<AppState>) -> Json<FeaturesResponse> {
    let features = state.service.feature_names().to_vec();
    Json(FeaturesResponse {
        count: features.len(),
        features,
    })
}
