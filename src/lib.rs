//! Mandible Sex Classifier
//!
//! Forensic sex estimation from 15 mandibular measurements.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │  mandible-train (offline)    │      │  mandible-classifier (axum)  │
//! │                              │      │                              │
//! │  CSV -> clean -> split       │      │  /health  /features          │
//! │  -> scale -> 5 candidates    │      │  /predict /sample            │
//! │  -> compare -> best bundle   │      │          │                   │
//! └──────────────┬───────────────┘      │          ▼                   │
//!                │                      │  InferenceService (shared,   │
//!                ▼                      │  read-only)                  │
//!        ┌──────────────┐   load once   │          │                   │
//!        │  artifacts/  │──────────────▶│  ExplanationService          │
//!        └──────────────┘               │  (optional, time-bounded)    │
//!                                       └──────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod models;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult, ClassifierError};

use logic::explain::ExplanationService;
use logic::inference::InferenceService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InferenceService>,
    pub explainer: Arc<ExplanationService>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(service: InferenceService, explainer: ExplanationService, config: config::Config) -> Self {
        Self {
            service: Arc::new(service),
            explainer: Arc::new(explainer),
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/features", get(handlers::features::list))
        .route("/predict", post(handlers::predict::predict))
        .route("/sample", get(handlers::sample::get));

    // Served at the root and under /api for the browser frontend
    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
