//! Model selector
//!
//! Scores candidates on the held-out split and picks the most accurate one.
//! Ties go to the candidate listed first.

use ndarray::Array2;
use serde::Serialize;

use super::metrics::accuracy;
use super::trainer::Candidate;
use crate::error::ClassifierError;
use crate::logic::model::{Classifier, ModelKind};

/// One row of the comparison table
#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub kind: ModelKind,
    pub name: &'static str,
    pub accuracy: f64,
    /// Position in the original enumeration
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct Evaluated {
    pub candidate: Candidate,
    pub accuracy: f64,
    pub predictions: Vec<usize>,
}

/// Held-out accuracy for every candidate, in enumeration order
pub fn evaluate(candidates: Vec<Candidate>, x_test: &Array2<f64>, y_test: &[usize]) -> Vec<Evaluated> {
    candidates
        .into_iter()
        .map(|candidate| {
            let predictions = candidate.model.predict_batch(x_test.view());
            let accuracy = accuracy(&predictions, y_test);
            tracing::info!("  {:<20} accuracy {:.4} ({:.2}%)", candidate.name(), accuracy, accuracy * 100.0);
            Evaluated {
                candidate,
                accuracy,
                predictions,
            }
        })
        .collect()
}

/// Comparison table sorted by accuracy descending, then enumeration order
pub fn rank(evaluated: &[Evaluated]) -> Vec<CandidateScore> {
    let mut table: Vec<CandidateScore> = evaluated
        .iter()
        .enumerate()
        .map(|(position, e)| CandidateScore {
            kind: e.candidate.kind,
            name: e.candidate.name(),
            accuracy: e.accuracy,
            position,
        })
        .collect();
    // Stable sort: equal accuracies keep enumeration order
    table.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
    table
}

/// Index of the winner: highest accuracy, first-listed on ties
pub fn select_best(evaluated: &[Evaluated]) -> Result<usize, ClassifierError> {
    let mut best: Option<usize> = None;
    for (i, e) in evaluated.iter().enumerate() {
        match best {
            Some(b) if e.accuracy <= evaluated[b].accuracy => {}
            _ => best = Some(i),
        }
    }
    best.ok_or_else(|| ClassifierError::Training("no candidates to select from".into()))
}
