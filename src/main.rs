//! Mandible classifier prediction server
//!
//! Loads the trained bundle once and serves the REST surface.

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mandible_classifier::config::Config;
use mandible_classifier::logic::explain::ExplanationService;
use mandible_classifier::logic::inference::InferenceService;
use mandible_classifier::{create_router, AppState};

#[tokio::main]
async fn main() {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mandible_classifier=debug,tower_http=debug".into());
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Mandible classifier server starting...");
    tracing::info!("Artifacts: {}", config.artifact_dir.display());

    // Artifacts are loaded exactly once; the service is read-only afterwards
    let service = InferenceService::from_dir(&config.artifact_dir);
    let explainer = ExplanationService::new(config.explanation());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], config.port)));

    let state = AppState::new(service, explainer, config);
    let app = create_router(state);

    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("   GET  /health   - Health check");
    tracing::info!("   GET  /features - Feature list");
    tracing::info!("   POST /predict  - Predict sex");
    tracing::info!("   GET  /sample   - Sample measurements");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
