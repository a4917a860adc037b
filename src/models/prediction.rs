//! Prediction response

use serde::Serialize;

use crate::logic::inference::{ClassProbabilities, Prediction};

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: PredictionBody,
    pub explanation: String,
    pub input: PredictionInput,
}

#[derive(Debug, Serialize)]
pub struct PredictionBody {
    /// Label code, "F" or "M"
    pub label: &'static str,
    pub label_full: &'static str,
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
}

/// Echo of the request for traceability
#[derive(Debug, Serialize)]
pub struct PredictionInput {
    pub measurements: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl PredictionResponse {
    pub fn new(prediction: Prediction, explanation: String, feature_names: &[String]) -> Self {
        Self {
            success: true,
            prediction: PredictionBody {
                label: prediction.sex.code(),
                label_full: prediction.sex.full_name(),
                confidence: prediction.confidence,
                probabilities: prediction.probabilities,
            },
            explanation,
            input: PredictionInput {
                measurements: prediction.measurements,
                feature_names: feature_names.to_vec(),
            },
        }
    }
}
