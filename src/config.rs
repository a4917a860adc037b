//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::logic::explain::GeminiConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory holding the trained artifact bundle
    pub artifact_dir: PathBuf,

    /// Text generation API key; absent disables explanations
    pub gemini_api_key: Option<String>,

    /// Text generation model name
    pub gemini_model: String,

    /// Text generation API base URL
    pub explanation_api_url: String,

    /// Upper bound for one explanation call
    pub explanation_timeout_secs: u64,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            artifact_dir: env::var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("artifacts")),

            gemini_api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),

            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),

            explanation_api_url: env::var("EXPLANATION_API_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),

            explanation_timeout_secs: env::var("EXPLANATION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Text generation settings, if an API key is configured
    pub fn explanation(&self) -> Option<GeminiConfig> {
        self.gemini_api_key.as_ref().map(|key| GeminiConfig {
            api_url: self.explanation_api_url.clone(),
            api_key: key.clone(),
            model: self.gemini_model.clone(),
            timeout_seconds: self.explanation_timeout_secs,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            artifact_dir: PathBuf::from("artifacts"),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            explanation_api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            explanation_timeout_secs: 10,
            environment: "development".to_string(),
        }
    }
}
