use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::logic::artifacts::{ArtifactBundle, ModelArtifact};
use crate::logic::explain::ExplanationService;
use crate::logic::features::{default_feature_names, FEATURE_COUNT, SAMPLE_MEASUREMENTS};
use crate::logic::inference::InferenceService;
use crate::logic::label::CodecState;
use crate::logic::model::{fixtures, ModelKind};
use crate::logic::scaler::StandardScaler;
use crate::{create_router, AppState};

fn ready_service() -> InferenceService {
    let (x, y) = fixtures::blobs(40, FEATURE_COUNT, 1.0, 5);
    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(x.view()).unwrap();

    InferenceService::from_bundle(ArtifactBundle {
        model: ModelArtifact {
            name: "Logistic Regression".to_string(),
            kind: ModelKind::LogisticRegression,
            accuracy: 0.75,
            trained_samples: y.len(),
            model: ModelKind::LogisticRegression.fit(&scaled, &y, 42).unwrap(),
        },
        scaler: scaler.state().unwrap().clone(),
        codec: CodecState {
            classes: vec!["F".to_string(), "M".to_string()],
        },
        feature_names: default_feature_names(),
    })
    .unwrap()
}

fn app(service: InferenceService) -> Router {
    create_router(AppState::new(service, ExplanationService::disabled(), Config::default()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let (status, body) = send(app(ready_service()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["models_loaded"], true);
    assert_eq!(body["explanation_service"], "disabled");
    assert_eq!(body["artifacts"]["label_codec"], true);
    assert_eq!(body["model"]["name"], "Logistic Regression");
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn test_features_under_both_prefixes() {
    for uri in ["/features", "/api/features"] {
        let (status, body) = send(app(ready_service()), get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 15);
        assert_eq!(body["features"][8], "M9 Gonial angle");
    }
}

#[tokio::test]
async fn test_sample_round_trips_through_predict() {
    let (_, sample) = send(app(ready_service()), get("/api/sample")).await;
    assert_eq!(sample["measurements"].as_array().unwrap().len(), FEATURE_COUNT);
    assert!(sample["description"].is_string());

    let measurements = sample["measurements"].clone();
    let request = json!({ "measurements": measurements }).to_string();
    let (status, body) = send(app(ready_service()), post_json("/api/predict", request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let label = body["prediction"]["label"].as_str().unwrap();
    assert!(label == "F" || label == "M");
    let confidence = body["prediction"]["confidence"].as_f64().unwrap();
    assert!((50.0..=100.0).contains(&confidence));
    let female = body["prediction"]["probabilities"]["Female"].as_f64().unwrap();
    let male = body["prediction"]["probabilities"]["Male"].as_f64().unwrap();
    assert!((female + male - 100.0).abs() <= 0.02);
    assert!(body["explanation"].as_str().unwrap().starts_with("AI analysis unavailable"));
    assert_eq!(body["input"]["measurements"][8], 120.0);
    assert_eq!(body["input"]["feature_names"].as_array().unwrap().len(), FEATURE_COUNT);
}

#[tokio::test]
async fn test_short_vector_is_bad_request() {
    let request = json!({ "measurements": &SAMPLE_MEASUREMENTS[..14] }).to_string();
    let (status, body) = send(app(ready_service()), post_json("/predict", request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Expected 15 measurements, got 14");
}

#[tokio::test]
async fn test_non_numeric_is_bad_request() {
    let mut values: Vec<Value> = SAMPLE_MEASUREMENTS.iter().map(|v| json!(v)).collect();
    values[2] = json!("wide");
    let request = json!({ "measurements": values }).to_string();
    let (status, body) = send(app(ready_service()), post_json("/predict", request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All measurements must be valid numbers");
}

#[tokio::test]
async fn test_out_of_range_number_is_bad_request() {
    let mut values: Vec<String> = SAMPLE_MEASUREMENTS.iter().map(|v| v.to_string()).collect();
    values[0] = "1e400".to_string();
    let request = format!("{{\"measurements\": [{}]}}", values.join(", "));
    let (status, body) = send(app(ready_service()), post_json("/predict", request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All measurements must be valid numbers");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (status, body) = send(app(ready_service()), post_json("/predict", "not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing measurements in request body");
}

#[tokio::test]
async fn test_missing_artifacts_degrade_gracefully() {
    let (status, body) = send(app(InferenceService::unavailable()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models_loaded"], false);
    assert!(body.get("model").is_none());

    let request = json!({ "measurements": SAMPLE_MEASUREMENTS }).to_string();
    let (status, body) = send(app(InferenceService::unavailable()), post_json("/predict", request)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Models not loaded properly");
}
