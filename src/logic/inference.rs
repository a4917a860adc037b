//! Inference Service
//!
//! Immutable serving context built once at startup from the artifact
//! directory. Requests flow through
//! `received -> validated -> scaled -> predicted -> responded`;
//! readiness is checked before anything else, and a rejected vector never
//! reaches the scaler or the model.

use std::path::Path;

use ndarray::Array1;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ClassifierError;
use crate::logic::artifacts::{self, ArtifactBundle, ModelArtifact};
use crate::logic::features::{default_feature_names, FEATURE_COUNT};
use crate::logic::label::{CodecState, LabelEncoder, Sex, CLASS_COUNT};
use crate::logic::model::Classifier;
use crate::logic::scaler::StandardScaler;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Which artifacts loaded successfully
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub model: bool,
    pub scaler: bool,
    pub label_codec: bool,
}

impl ArtifactStatus {
    pub fn all_loaded(&self) -> bool {
        self.model && self.scaler && self.label_codec
    }
}

/// Per-class probabilities in percent, rounded to 2 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    #[serde(rename = "Female")]
    pub female: f64,
    #[serde(rename = "Male")]
    pub male: f64,
}

/// Final result of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub sex: Sex,
    /// max(probabilities) x 100, rounded to 2 decimals
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
    /// The validated, unscaled input
    pub measurements: Vec<f64>,
}

struct LoadedBundle {
    model: ModelArtifact,
    scaler: StandardScaler,
    codec: LabelEncoder,
    /// Class for each codec ordinal
    ordinal_sex: [Sex; CLASS_COUNT],
}

pub struct InferenceService {
    bundle: Option<LoadedBundle>,
    status: ArtifactStatus,
    feature_names: Vec<String>,
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

impl InferenceService {
    /// Load every artifact from `dir`. Never fails: a missing or corrupt
    /// artifact leaves the service in the not-ready state.
    pub fn from_dir(dir: &Path) -> Self {
        tracing::info!("Loading artifacts from {}", dir.display());

        let model = log_outcome(
            "model",
            artifacts::load_model(dir).and_then(|stamped| {
                check_width(&stamped.payload)?;
                Ok(stamped)
            }),
        );
        let scaler = log_outcome("scaler", artifacts::load_scaler(dir));
        let codec = log_outcome(
            "label codec",
            artifacts::load_codec(dir).and_then(|stamped| {
                let order = ordinal_sex(&stamped.payload)?;
                Ok((stamped, order))
            }),
        );

        let feature_names = match artifacts::load_feature_names(dir) {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("{}; using built-in feature names", e);
                default_feature_names()
            }
        };

        let status = ArtifactStatus {
            model: model.is_some(),
            scaler: scaler.is_some(),
            label_codec: codec.is_some(),
        };

        let bundle = match (model, scaler, codec) {
            (Some(model), Some(scaler), Some((codec, ordinal_sex))) => {
                let runs: [Uuid; 3] = [model.run_id, scaler.run_id, codec.run_id];
                if runs.iter().any(|r| *r != runs[0]) {
                    tracing::warn!(
                        "Artifacts come from different training runs (model {}, scaler {}, codec {}), predictions disabled",
                        runs[0],
                        runs[1],
                        runs[2]
                    );
                    None
                } else {
                    tracing::info!(
                        "Serving {} ({:.2}% held-out accuracy, run {} trained {})",
                        model.payload.name,
                        model.payload.accuracy * 100.0,
                        model.run_id,
                        model.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                    Some(LoadedBundle {
                        model: model.payload,
                        scaler: StandardScaler::from_state(scaler.payload),
                        codec: LabelEncoder::from_state(codec.payload),
                        ordinal_sex,
                    })
                }
            }
            _ => {
                tracing::warn!("Artifacts incomplete, predictions disabled: {:?}", status);
                None
            }
        };

        Self {
            bundle,
            status,
            feature_names,
        }
    }

    /// Serve a bundle straight out of a training run
    pub fn from_bundle(bundle: ArtifactBundle) -> Result<Self, ClassifierError> {
        if bundle.scaler.n_features() != FEATURE_COUNT {
            return Err(ClassifierError::artifact(
                artifacts::SCALER_FILE,
                format!("expected {} features, found {}", FEATURE_COUNT, bundle.scaler.n_features()),
            ));
        }
        check_width(&bundle.model)?;
        let ordinal_sex = ordinal_sex(&bundle.codec)?;
        let feature_names = if bundle.feature_names.len() == FEATURE_COUNT {
            bundle.feature_names
        } else {
            default_feature_names()
        };

        Ok(Self {
            bundle: Some(LoadedBundle {
                model: bundle.model,
                scaler: StandardScaler::from_state(bundle.scaler),
                codec: LabelEncoder::from_state(bundle.codec),
                ordinal_sex,
            }),
            status: ArtifactStatus {
                model: true,
                scaler: true,
                label_codec: true,
            },
            feature_names,
        })
    }

    /// A service with nothing loaded
    pub fn unavailable() -> Self {
        Self {
            bundle: None,
            status: ArtifactStatus::default(),
            feature_names: default_feature_names(),
        }
    }
}

fn log_outcome<T>(what: &str, result: Result<T, ClassifierError>) -> Option<T> {
    match result {
        Ok(value) => {
            tracing::info!("Loaded {}", what);
            Some(value)
        }
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}

/// The model must take rows of exactly `FEATURE_COUNT` measurements
fn check_width(model: &ModelArtifact) -> Result<(), ClassifierError> {
    if model.model.accepts_width(FEATURE_COUNT) {
        return Ok(());
    }
    Err(ClassifierError::artifact(
        artifacts::MODEL_FILE,
        format!(
            "model expects {} features, not {}",
            model.model.n_features().unwrap_or_default(),
            FEATURE_COUNT
        ),
    ))
}

/// The codec must hold exactly the two known classes
fn ordinal_sex(codec: &CodecState) -> Result<[Sex; CLASS_COUNT], ClassifierError> {
    if codec.classes.len() != CLASS_COUNT {
        return Err(ClassifierError::artifact(
            artifacts::CODEC_FILE,
            format!("expected {} classes, found {:?}", CLASS_COUNT, codec.classes),
        ));
    }
    let first = Sex::from_code(&codec.classes[0])?;
    let second = Sex::from_code(&codec.classes[1])?;
    if first == second {
        return Err(ClassifierError::artifact(artifacts::CODEC_FILE, "duplicate class"));
    }
    Ok([first, second])
}

// ============================================================================
// SERVING
// ============================================================================

impl InferenceService {
    pub fn is_ready(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn status(&self) -> ArtifactStatus {
        self.status
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Name and held-out accuracy of the served model
    pub fn model_summary(&self) -> Option<(&str, f64)> {
        self.bundle
            .as_ref()
            .map(|b| (b.model.name.as_str(), b.model.accuracy))
    }

    /// Full request path: `body` is the parsed request JSON, `None` when the
    /// body was not JSON at all.
    pub fn predict(&self, body: Option<&Value>) -> Result<Prediction, ClassifierError> {
        let bundle = self.bundle.as_ref().ok_or(ClassifierError::ServiceUnavailable)?;
        let measurements = parse_measurements(body)?;
        bundle.predict(measurements)
    }

    /// Full request path for a raw body. A body that is not JSON counts as
    /// missing measurements, unless it only failed on a number outside the
    /// f64 range.
    pub fn predict_body(&self, body: &[u8]) -> Result<Prediction, ClassifierError> {
        if !self.is_ready() {
            return Err(ClassifierError::ServiceUnavailable);
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => self.predict(Some(&value)),
            Err(e) if is_out_of_range(&e) => Err(invalid_number()),
            Err(_) => self.predict(None),
        }
    }

    /// Predict on an already validated vector
    pub fn predict_measurements(&self, measurements: &[f64]) -> Result<Prediction, ClassifierError> {
        let bundle = self.bundle.as_ref().ok_or(ClassifierError::ServiceUnavailable)?;
        if measurements.len() != FEATURE_COUNT {
            return Err(count_error(measurements.len()));
        }
        if measurements.iter().any(|v| !v.is_finite()) {
            return Err(invalid_number());
        }
        bundle.predict(measurements.to_vec())
    }
}

impl LoadedBundle {
    fn predict(&self, measurements: Vec<f64>) -> Result<Prediction, ClassifierError> {
        let row = Array1::from(measurements.clone());
        let scaled = self.scaler.transform_row(row.view())?;

        let ordinal = self.model.model.predict(scaled.view());
        let proba = self.model.model.predict_proba(scaled.view());

        let code = self.codec.decode(ordinal)?;
        let sex = Sex::from_code(code)?;

        let mut probabilities = ClassProbabilities {
            female: 0.0,
            male: 0.0,
        };
        for (i, &p) in proba.iter().enumerate() {
            match self.ordinal_sex[i] {
                Sex::Female => probabilities.female = round2(p * 100.0),
                Sex::Male => probabilities.male = round2(p * 100.0),
            }
        }
        let confidence = round2(proba.iter().copied().fold(0.0, f64::max) * 100.0);

        tracing::debug!("Predicted {} ({:.2}% confidence)", sex.full_name(), confidence);

        Ok(Prediction {
            sex,
            confidence,
            probabilities,
            measurements,
        })
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Extract and coerce the `measurements` field of a request body
pub fn parse_measurements(body: Option<&Value>) -> Result<Vec<f64>, ClassifierError> {
    let raw = match body.and_then(|b| b.get("measurements")) {
        Some(Value::Null) | None => {
            return Err(ClassifierError::Validation(
                "Missing measurements in request body".to_string(),
            ))
        }
        Some(raw) => raw,
    };

    let items = match raw {
        Value::Array(items) => items,
        // A lone scalar counts as a single measurement
        _ => return Err(count_error(1)),
    };
    if items.len() != FEATURE_COUNT {
        return Err(count_error(items.len()));
    }

    items.iter().map(coerce).collect()
}

fn coerce(value: &Value) -> Result<f64, ClassifierError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite()).ok_or_else(invalid_number)
}

fn is_out_of_range(e: &serde_json::Error) -> bool {
    e.is_syntax() && e.to_string().starts_with("number out of range")
}

fn count_error(got: usize) -> ClassifierError {
    ClassifierError::Validation(format!("Expected {} measurements, got {}", FEATURE_COUNT, got))
}

fn invalid_number() -> ClassifierError {
    ClassifierError::Validation("All measurements must be valid numbers".to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::SAMPLE_MEASUREMENTS;
    use crate::logic::model::{fixtures, ModelKind};
    use serde_json::json;

    fn service() -> InferenceService {
        let (x, y) = fixtures::blobs(40, FEATURE_COUNT, 1.0, 3);
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(x.view()).unwrap();
        let model = ModelKind::LogisticRegression.fit(&scaled, &y, 42).unwrap();

        let bundle = ArtifactBundle {
            model: ModelArtifact {
                name: "Logistic Regression".to_string(),
                kind: ModelKind::LogisticRegression,
                accuracy: 0.75,
                trained_samples: y.len(),
                model,
            },
            scaler: scaler.state().unwrap().clone(),
            codec: CodecState {
                classes: vec!["F".to_string(), "M".to_string()],
            },
            feature_names: default_feature_names(),
        };
        InferenceService::from_bundle(bundle).unwrap()
    }

    fn saved_bundle(trained: &InferenceService) -> ArtifactBundle {
        let loaded = trained.bundle.as_ref().unwrap();
        ArtifactBundle {
            model: loaded.model.clone(),
            scaler: loaded.scaler.state().unwrap().clone(),
            codec: CodecState {
                classes: vec!["F".to_string(), "M".to_string()],
            },
            feature_names: default_feature_names(),
        }
    }

    fn body(values: Vec<Value>) -> Value {
        json!({ "measurements": values })
    }

    #[test]
    fn test_sample_vector_predicts() {
        let service = service();
        let request = json!({ "measurements": SAMPLE_MEASUREMENTS });
        let prediction = service.predict(Some(&request)).unwrap();

        assert!(prediction.confidence >= 50.0 && prediction.confidence <= 100.0);
        let total = prediction.probabilities.female + prediction.probabilities.male;
        assert!((total - 100.0).abs() <= 0.02);
        assert_eq!(prediction.measurements, SAMPLE_MEASUREMENTS.to_vec());
    }

    #[test]
    fn test_confidence_matches_predicted_class() {
        let service = service();
        let ones = vec![1.0; FEATURE_COUNT];
        let request = json!({ "measurements": ones });
        let prediction = service.predict(Some(&request)).unwrap();
        let expected = match prediction.sex {
            Sex::Female => prediction.probabilities.female,
            Sex::Male => prediction.probabilities.male,
        };
        assert_eq!(prediction.confidence, expected);
    }

    #[test]
    fn test_prediction_is_idempotent() {
        let service = service();
        let request = json!({ "measurements": SAMPLE_MEASUREMENTS });
        let first = service.predict(Some(&request)).unwrap();
        let second = service.predict(Some(&request)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let service = service();
        let mut values: Vec<Value> = SAMPLE_MEASUREMENTS.iter().map(|v| json!(v)).collect();
        values[0] = json!("10.5");
        let from_strings = service.predict(Some(&body(values))).unwrap();
        let from_numbers = service
            .predict(Some(&json!({ "measurements": SAMPLE_MEASUREMENTS })))
            .unwrap();
        assert_eq!(from_strings, from_numbers);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let service = service();
        let values: Vec<Value> = SAMPLE_MEASUREMENTS[..14].iter().map(|v| json!(v)).collect();
        let err = service.predict(Some(&body(values))).unwrap_err();
        assert_eq!(err.to_string(), "Expected 15 measurements, got 14");
    }

    #[test]
    fn test_non_numeric_element_is_rejected() {
        let service = service();
        for bad in [json!("abc"), json!(true), json!(null), json!([1.0]), json!("NaN")] {
            let mut values: Vec<Value> = SAMPLE_MEASUREMENTS.iter().map(|v| json!(v)).collect();
            values[4] = bad;
            let err = service.predict(Some(&body(values))).unwrap_err();
            assert_eq!(err.to_string(), "All measurements must be valid numbers");
        }
    }

    #[test]
    fn test_missing_measurements() {
        let service = service();
        for request in [json!({}), json!({ "measurements": null }), json!([1, 2, 3])] {
            let err = service.predict(Some(&request)).unwrap_err();
            assert_eq!(err.to_string(), "Missing measurements in request body");
        }
        assert!(matches!(service.predict(None), Err(ClassifierError::Validation(_))));
    }

    #[test]
    fn test_raw_body_paths() {
        let service = service();
        let body = json!({ "measurements": SAMPLE_MEASUREMENTS }).to_string();
        assert_eq!(
            service.predict_body(body.as_bytes()).unwrap(),
            service.predict(Some(&json!({ "measurements": SAMPLE_MEASUREMENTS }))).unwrap()
        );

        let overflow = body.replacen("120.0", "1e400", 1);
        assert_ne!(overflow, body);
        let err = service.predict_body(overflow.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "All measurements must be valid numbers");

        let err = service.predict_body(b"{\"measurements\": [1, 2").unwrap_err();
        assert_eq!(err.to_string(), "Missing measurements in request body");
    }

    #[test]
    fn test_unavailable_service() {
        let service = InferenceService::unavailable();
        assert!(!service.is_ready());
        assert!(!service.status().all_loaded());
        let request = json!({ "measurements": SAMPLE_MEASUREMENTS });
        assert!(matches!(service.predict(Some(&request)), Err(ClassifierError::ServiceUnavailable)));
        assert_eq!(service.feature_names().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_empty_directory_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let service = InferenceService::from_dir(dir.path());
        assert!(!service.is_ready());
        assert_eq!(service.status(), ArtifactStatus::default());
        assert_eq!(service.feature_names(), default_feature_names().as_slice());
    }

    #[test]
    fn test_loads_saved_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let trained = service();
        artifacts::save_bundle(dir.path(), &saved_bundle(&trained), &[]).unwrap();

        let loaded = InferenceService::from_dir(dir.path());
        assert!(loaded.status().all_loaded());
        let request = json!({ "measurements": SAMPLE_MEASUREMENTS });
        assert_eq!(
            loaded.predict(Some(&request)).unwrap(),
            trained.predict(Some(&request)).unwrap()
        );
    }

    #[test]
    fn test_mixed_training_runs_are_not_served() {
        let (run_a, run_b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        let bundle = saved_bundle(&service());
        artifacts::save_bundle(run_a.path(), &bundle, &[]).unwrap();
        artifacts::save_bundle(run_b.path(), &bundle, &[]).unwrap();
        std::fs::copy(
            run_b.path().join(artifacts::SCALER_FILE),
            run_a.path().join(artifacts::SCALER_FILE),
        )
        .unwrap();

        let mixed = InferenceService::from_dir(run_a.path());
        assert!(!mixed.is_ready());
        assert!(mixed.model_summary().is_none());
        let request = json!({ "measurements": SAMPLE_MEASUREMENTS });
        assert!(matches!(mixed.predict(Some(&request)), Err(ClassifierError::ServiceUnavailable)));
    }

    #[test]
    fn test_model_of_wrong_width_is_refused() {
        let (x, y) = fixtures::blobs(20, 4, 1.0, 9);
        let mut narrow = saved_bundle(&service());
        narrow.model.model = ModelKind::LogisticRegression.fit(&x, &y, 42).unwrap();

        let err = InferenceService::from_bundle(narrow.clone()).err().unwrap();
        assert!(err.to_string().contains("model expects 4 features"), "{}", err);

        let dir = tempfile::tempdir().unwrap();
        artifacts::save_bundle(dir.path(), &narrow, &[]).unwrap();
        let loaded = InferenceService::from_dir(dir.path());
        assert!(!loaded.status().model);
        assert!(!loaded.is_ready());
    }

    #[test]
    fn test_tree_splitting_past_the_input_is_refused() {
        use crate::logic::model::{tree::Node, DecisionTree, TrainedModel};

        let mut bundle = saved_bundle(&service());
        bundle.model.model = TrainedModel::DecisionTree(DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: FEATURE_COUNT,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { proba: [1.0, 0.0] },
                Node::Leaf { proba: [0.0, 1.0] },
            ],
        });
        assert!(InferenceService::from_bundle(bundle).is_err());
    }

    #[test]
    fn test_rejects_foreign_codec() {
        let codec = CodecState {
            classes: vec!["A".to_string(), "B".to_string()],
        };
        assert!(ordinal_sex(&codec).is_err());
    }
}
