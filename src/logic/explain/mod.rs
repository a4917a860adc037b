//! Explanation Module - Best-effort narrative for a finished prediction
//!
//! The generator is optional and time-bounded. Whatever happens on the wire,
//! `explain` returns a string; the prediction itself is already final.

pub mod client;
pub mod fallback;

use std::time::Duration;

use crate::logic::inference::Prediction;

pub use client::{ExplainError, GeminiClient, GeminiConfig};

pub struct ExplanationService {
    client: Option<GeminiClient>,
    timeout: Duration,
}

impl ExplanationService {
    /// Enabled only when `config` is present and the HTTP client builds
    pub fn new(config: Option<GeminiConfig>) -> Self {
        let Some(config) = config else {
            tracing::info!("Text generation disabled (no API key)");
            return Self::disabled();
        };

        let timeout = Duration::from_secs(config.timeout_seconds);
        match GeminiClient::new(config) {
            Ok(client) => {
                tracing::info!("Text generation enabled ({})", client.model());
                Self {
                    client: Some(client),
                    timeout,
                }
            }
            Err(e) => {
                tracing::warn!("Text generation disabled: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Narrative for `prediction`; `model` is the served model's name and accuracy
    pub async fn explain(&self, prediction: &Prediction, model: Option<(&str, f64)>) -> String {
        let Some(client) = &self.client else {
            return fallback::unavailable(prediction);
        };

        let prompt = fallback::prompt(prediction);
        let outcome = match tokio::time::timeout(self.timeout, client.generate(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ExplainError::Timeout),
        };

        match outcome {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Explanation fallback: {}", e);
                fallback::narrative(prediction, model)
            }
        }
    }
}
