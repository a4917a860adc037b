//! Held-out evaluation metrics

use serde::Serialize;

/// Fraction of exact label matches
pub fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    hits as f64 / truth.len() as f64
}

/// `matrix[actual][predicted]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(predicted: &[usize], truth: &[usize], n_classes: usize) -> Self {
        let mut matrix = vec![vec![0; n_classes]; n_classes];
        for (&p, &t) in predicted.iter().zip(truth) {
            if p < n_classes && t < n_classes {
                matrix[t][p] += 1;
            }
        }
        Self { matrix }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision / recall / F1, labels in ordinal order
pub fn classification_report(confusion: &ConfusionMatrix, labels: &[String]) -> Vec<ClassMetrics> {
    let m = &confusion.matrix;
    labels
        .iter()
        .enumerate()
        .map(|(k, label)| {
            let tp = m[k][k] as f64;
            let predicted: usize = m.iter().map(|row| row[k]).sum();
            let support: usize = m[k].iter().sum();

            let precision = if predicted > 0 { tp / predicted as f64 } else { 0.0 };
            let recall = if support > 0 { tp / support as f64 } else { 0.0 };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}
