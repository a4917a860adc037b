//! Health, feature list and sample responses

use serde::Serialize;

use crate::logic::inference::ArtifactStatus;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub models_loaded: bool,
    /// "enabled" or "disabled"
    pub explanation_service: &'static str,
    pub artifacts: ArtifactStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelInfo>,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub name: String,
    /// Held-out accuracy, 0.0 - 1.0
    pub accuracy: f64,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SampleResponse {
    pub measurements: Vec<f64>,
    pub feature_names: Vec<String>,
    pub description: &'static str,
}
