//! Multi-model trainer
//!
//! Fits every candidate family on the same scaled split. Candidates share no
//! state: each gets its own copy of the seed.

use std::time::Instant;

use ndarray::Array2;

use crate::error::ClassifierError;
use crate::logic::model::{ModelKind, TrainedModel};

/// A fitted candidate, not yet evaluated
#[derive(Debug, Clone)]
pub struct Candidate {
    pub kind: ModelKind,
    pub model: TrainedModel,
}

impl Candidate {
    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }
}

/// Fit the given families in order
pub fn train_candidates(
    kinds: &[ModelKind],
    x_train: &Array2<f64>,
    y_train: &[usize],
    seed: u64,
) -> Result<Vec<Candidate>, ClassifierError> {
    let total = kinds.len();
    kinds
        .iter()
        .enumerate()
        .map(|(i, &kind)| {
            tracing::info!("[{}/{}] Training {}...", i + 1, total, kind.display_name());
            let started = Instant::now();
            let model = kind.fit(x_train, y_train, seed)?;
            tracing::debug!("{} fitted in {:?}", kind.display_name(), started.elapsed());
            Ok(Candidate { kind, model })
        })
        .collect()
}
