//! Training Module - Offline pipeline
//!
//! cleaned table -> label encoding -> stratified split -> scaling ->
//! multi-model fit -> held-out comparison -> winning bundle.

pub mod metrics;
pub mod selector;
pub mod trainer;

#[cfg(test)]
mod tests;

use crate::error::ClassifierError;
use crate::logic::artifacts::{ArtifactBundle, ModelArtifact};
use crate::logic::dataset::{stratified_split, Dataset, DEFAULT_SEED, DEFAULT_TEST_SIZE};
use crate::logic::features::SAMPLE_MEASUREMENTS;
use crate::logic::inference::{InferenceService, Prediction};
use crate::logic::label::{LabelEncoder, CLASS_COUNT};
use crate::logic::model::ModelKind;
use crate::logic::scaler::StandardScaler;

pub use metrics::{ClassMetrics, ConfusionMatrix};
pub use selector::{CandidateScore, Evaluated};
pub use trainer::Candidate;

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub test_size: f64,
    pub seed: u64,
    /// Families to train, in ranking order
    pub kinds: Vec<ModelKind>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SEED,
            kinds: ModelKind::ALL.to_vec(),
        }
    }
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ArtifactBundle,
    /// Ranked comparison table, best first
    pub comparison: Vec<CandidateScore>,
    /// Every candidate with its held-out score, in enumeration order
    pub candidates: Vec<Evaluated>,
    pub confusion: ConfusionMatrix,
    pub report: Vec<ClassMetrics>,
    pub n_train: usize,
    pub n_test: usize,
}

impl TrainingOutcome {
    pub fn best(&self) -> &ModelArtifact {
        &self.bundle.model
    }

    /// Serve the winning bundle on the built-in sample vector
    pub fn sample_prediction(&self) -> Result<Prediction, ClassifierError> {
        InferenceService::from_bundle(self.bundle.clone())?.predict_measurements(&SAMPLE_MEASUREMENTS)
    }
}

/// Run the whole pipeline on a cleaned dataset
pub fn run(dataset: &Dataset, options: &TrainingOptions) -> Result<TrainingOutcome, ClassifierError> {
    // Codec is fit once on the full label set
    let mut encoder = LabelEncoder::new();
    let codec = encoder.fit(&dataset.labels).clone();
    if codec.classes.len() != CLASS_COUNT {
        return Err(ClassifierError::Training(format!(
            "expected {} classes, found {:?}",
            CLASS_COUNT, codec.classes
        )));
    }
    let y = encoder.encode_all(&dataset.labels)?;
    tracing::info!("Target encoded: {:?} -> {:?}", codec.classes, (0..CLASS_COUNT).collect::<Vec<_>>());

    let split = stratified_split(&dataset.features, &y, CLASS_COUNT, options.test_size, options.seed)?;
    tracing::info!(
        "Split: {} training / {} held-out samples",
        split.y_train.len(),
        split.y_test.len()
    );

    let mut scaler = StandardScaler::new();
    let x_train = scaler.fit_transform(split.x_train.view())?;
    let x_test = scaler.transform(split.x_test.view())?;
    let scaler_state = scaler.state()?.clone();

    let candidates = trainer::train_candidates(&options.kinds, &x_train, &split.y_train, options.seed)?;

    tracing::info!("Held-out evaluation:");
    let evaluated = selector::evaluate(candidates, &x_test, &split.y_test);
    let comparison = selector::rank(&evaluated);
    let best = &evaluated[selector::select_best(&evaluated)?];

    tracing::info!(
        "Best model: {} ({:.2}% accuracy)",
        best.candidate.name(),
        best.accuracy * 100.0
    );

    let confusion = ConfusionMatrix::new(&best.predictions, &split.y_test, CLASS_COUNT);
    let report = metrics::classification_report(&confusion, &codec.classes);

    let bundle = ArtifactBundle {
        model: ModelArtifact {
            name: best.candidate.name().to_string(),
            kind: best.candidate.kind,
            accuracy: best.accuracy,
            trained_samples: split.y_train.len(),
            model: best.candidate.model.clone(),
        },
        scaler: scaler_state,
        codec,
        feature_names: dataset.feature_names.clone(),
    };

    Ok(TrainingOutcome {
        bundle,
        comparison,
        n_train: split.y_train.len(),
        n_test: split.y_test.len(),
        candidates: evaluated,
        confusion,
        report,
    })
}
