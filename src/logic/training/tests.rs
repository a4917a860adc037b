use super::{run, TrainingOptions};
use crate::error::ClassifierError;
use crate::logic::dataset::Dataset;
use crate::logic::features::{default_feature_names, FEATURE_COUNT, SAMPLE_MEASUREMENTS};
use crate::logic::inference::InferenceService;
use crate::logic::model::{fixtures, ModelKind};

fn dataset(n_per_class: usize) -> Dataset {
    let (features, y) = fixtures::blobs(n_per_class, FEATURE_COUNT, 0.8, 11);
    let labels = y
        .iter()
        .map(|&c| if c == 0 { "F".to_string() } else { "M".to_string() })
        .collect();
    Dataset {
        features,
        labels,
        feature_names: default_feature_names(),
        imputed_cells: 0,
    }
}

fn quick_options() -> TrainingOptions {
    TrainingOptions {
        kinds: vec![ModelKind::LogisticRegression, ModelKind::DecisionTree],
        ..TrainingOptions::default()
    }
}

#[test]
fn test_full_pipeline_is_deterministic() {
    let data = dataset(50);
    let options = TrainingOptions::default();

    let first = run(&data, &options).unwrap();
    let second = run(&data, &options).unwrap();

    assert_eq!(first.candidates.len(), ModelKind::ALL.len());
    for (a, b) in first.candidates.iter().zip(&second.candidates) {
        assert_eq!(a.candidate.kind, b.candidate.kind);
        assert_eq!(a.accuracy, b.accuracy);
        assert_eq!(a.predictions, b.predictions);
    }
    assert_eq!(first.best().name, second.best().name);
    assert_eq!(first.confusion, second.confusion);
}

#[test]
fn test_split_sizes_and_report() {
    let outcome = run(&dataset(50), &quick_options()).unwrap();

    // ceil(100 * 0.2)
    assert_eq!(outcome.n_test, 20);
    assert_eq!(outcome.n_train, 80);
    assert_eq!(outcome.best().trained_samples, 80);

    assert_eq!(outcome.report.len(), 2);
    assert_eq!(outcome.report[0].label, "F");
    let support: usize = outcome.report.iter().map(|r| r.support).sum();
    assert_eq!(support, outcome.n_test);
}

#[test]
fn test_comparison_is_ranked() {
    let outcome = run(&dataset(50), &quick_options()).unwrap();

    assert_eq!(outcome.comparison.len(), 2);
    assert!(outcome.comparison[0].accuracy >= outcome.comparison[1].accuracy);
    assert_eq!(outcome.comparison[0].name, outcome.best().name);
    assert_eq!(outcome.comparison[0].accuracy, outcome.best().accuracy);
}

#[test]
fn test_separable_data_is_learned() {
    let outcome = run(&dataset(50), &quick_options()).unwrap();
    assert!(outcome.best().accuracy >= 0.9, "accuracy {}", outcome.best().accuracy);
}

#[test]
fn test_bundle_serves_sample_vector() {
    let outcome = run(&dataset(50), &quick_options()).unwrap();
    let prediction = outcome.sample_prediction().unwrap();
    assert!(prediction.confidence >= 50.0 && prediction.confidence <= 100.0);
    let total = prediction.probabilities.female + prediction.probabilities.male;
    assert!((total - 100.0).abs() <= 0.02);
    assert_eq!(prediction.measurements, SAMPLE_MEASUREMENTS.to_vec());

    let service = InferenceService::from_bundle(outcome.bundle.clone()).unwrap();
    assert_eq!(service.predict_measurements(&SAMPLE_MEASUREMENTS).unwrap(), prediction);
}

#[test]
fn test_single_class_is_rejected() {
    let mut data = dataset(10);
    data.labels = vec!["F".to_string(); data.labels.len()];
    assert!(matches!(run(&data, &quick_options()), Err(ClassifierError::Training(_))));
}
