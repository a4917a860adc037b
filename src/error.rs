//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

/// Domain errors raised by the training pipeline and the inference path
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// Training source unreadable or malformed
    #[error("Failed to load dataset: {0}")]
    DataLoad(String),

    /// Scaler or label codec used before `fit`
    #[error("{0} used before it was fitted")]
    NotFitted(&'static str),

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    /// Persisted artifact missing, corrupt or of the wrong kind
    #[error("Failed to load artifact '{name}': {reason}")]
    ArtifactLoad { name: String, reason: String },

    /// Malformed inference input; the message is shown to the caller as is
    #[error("{0}")]
    Validation(String),

    #[error("Models not loaded properly")]
    ServiceUnavailable,

    #[error("Training failed: {0}")]
    Training(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassifierError {
    pub fn artifact(name: impl Into<String>, reason: impl ToString) -> Self {
        ClassifierError::ArtifactLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Errors crossing the HTTP boundary
#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    ServiceUnavailable,
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(msg) => {
                tracing::warn!("Rejected prediction request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::ServiceUnavailable => {
                tracing::warn!("Prediction requested but artifacts are not loaded");
                (StatusCode::INTERNAL_SERVER_ERROR, "Models not loaded properly".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Prediction error: {}", msg))
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ClassifierError> for AppError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Validation(msg) => AppError::ValidationError(msg),
            ClassifierError::ServiceUnavailable => AppError::ServiceUnavailable,
            other => AppError::InternalError(other.to_string()),
        }
    }
}
