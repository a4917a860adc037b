//! Text generation client
//!
//! Thin wrapper over the Gemini `generateContent` REST endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the text generation endpoint
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
}

pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

// Request/Response types

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    pub(crate) fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ExplainError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ExplainError::NetworkError(e.to_string()))?;

        Ok(Self { config, http_client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Generate text for a single prompt
    pub async fn generate(&self, prompt: &str) -> Result<String, ExplainError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExplainError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            tracing::debug!("Text generation failed ({}): {}", status, error_text);
            return Err(ExplainError::ServerError(status));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ExplainError::ParseError(e.to_string()))?;

        body.text().ok_or(ExplainError::EmptyResponse)
    }
}

/// Text generation errors
#[derive(Debug, Clone)]
pub enum ExplainError {
    NetworkError(String),
    ServerError(u16),
    ParseError(String),
    EmptyResponse,
    Timeout,
}

impl std::fmt::Display for ExplainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError(e) => write!(f, "Network error: {}", e),
            Self::ServerError(code) => write!(f, "Server error: {}", code),
            Self::ParseError(e) => write!(f, "Parse error: {}", e),
            Self::EmptyResponse => write!(f, "Response contained no text"),
            Self::Timeout => write!(f, "Timed out"),
        }
    }
}

impl std::error::Error for ExplainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_is_joined() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Broad ramus. "},{"text":"Square chin."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("Broad ramus. Square chin."));
    }

    #[test]
    fn test_empty_response_has_no_text() {
        let body: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(body.text().is_none());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(blocked.text().is_none());
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
    }
}
