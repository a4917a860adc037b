//! Health check handler

use axum::{extract::State, Json};

use crate::models::{HealthResponse, ModelInfo};
use crate::AppState;

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let service = &state.service;
    Json(HealthResponse {
        status: "healthy",
        message: "Mandible sex classifier API is running",
        models_loaded: service.is_ready(),
        explanation_service: if state.explainer.is_enabled() { "enabled" } else { "disabled" },
        artifacts: service.status(),
        model: service.model_summary().map(|(name, accuracy)| ModelInfo {
            name: name.to_string(),
            accuracy,
        }),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
