//! RBF-kernel support vector machine with Platt-calibrated probabilities
//!
//! - Solver: `linfa_svm` with a Gaussian kernel; only the support vectors,
//!   their signed alphas and rho are kept for inference
//! - Decision: f(x) = sum(coef_i * k(sv_i, x)) - rho, positive means class 1
//! - Probability: P(class 1 | f) = 1 / (1 + exp(A * f + B)), with A and B
//!   fitted on cross-validated decision values

use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{Classifier, Probabilities};
use crate::error::ClassifierError;

#[derive(Debug, Clone)]
pub struct SvmParams {
    pub c: f64,
    /// None selects `1 / (n_features * var(X))`
    pub gamma: Option<f64>,
    /// Folds used to collect decision values for Platt scaling
    pub calibration_folds: usize,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            calibration_folds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    pub support_vectors: Array2<f64>,
    /// alpha_i * y_i for each support vector
    pub dual_coef: Vec<f64>,
    pub rho: f64,
    pub gamma: f64,
    pub prob_a: f64,
    pub prob_b: f64,
}

impl SvmClassifier {
    pub fn fit(x: &Array2<f64>, y: &[usize], params: &SvmParams, seed: u64) -> Result<Self, ClassifierError> {
        let gamma = params.gamma.unwrap_or_else(|| scale_gamma(x));
        let mut model = Self::fit_uncalibrated(x, y, params, gamma)?;

        let decisions = cross_validated_decisions(x, y, params, gamma, seed)?;
        let (a, b) = fit_sigmoid(&decisions, y);
        model.prob_a = a;
        model.prob_b = b;
        Ok(model)
    }

    fn fit_uncalibrated(x: &Array2<f64>, y: &[usize], params: &SvmParams, gamma: f64) -> Result<Self, ClassifierError> {
        let targets: Array1<bool> = y.iter().map(|&c| c == 1).collect();
        let dataset = Dataset::new(x.clone(), targets);

        // linfa's Gaussian kernel is exp(-|x - y|^2 / eps)
        let svm = Svm::<_, bool>::params()
            .pos_neg_weights(params.c, params.c)
            .gaussian_kernel(1.0 / gamma)
            .fit(&dataset)
            .map_err(|e| ClassifierError::Training(format!("SVM fit failed: {}", e)))?;

        // alpha is signed and spans every training row; zero rows are not support vectors
        let support: Vec<usize> = (0..y.len()).filter(|&i| svm.alpha[i] != 0.0).collect();
        Ok(Self {
            support_vectors: x.select(Axis(0), &support),
            dual_coef: support.iter().map(|&i| svm.alpha[i]).collect(),
            rho: svm.rho,
            gamma,
            prob_a: 0.0,
            prob_b: 0.0,
        })
    }

    pub fn decision_function(&self, row: ArrayView1<f64>) -> f64 {
        let sum: f64 = self
            .support_vectors
            .rows()
            .into_iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| coef * rbf(sv, row, self.gamma))
            .sum();
        sum - self.rho
    }

    pub fn n_support(&self) -> usize {
        self.dual_coef.len()
    }
}

impl Classifier for SvmClassifier {
    fn predict_proba(&self, row: ArrayView1<f64>) -> Probabilities {
        let p1 = platt_probability(self.decision_function(row), self.prob_a, self.prob_b)
            .clamp(1e-7, 1.0 - 1e-7);
        [1.0 - p1, p1]
    }

    /// Class from the margin sign, not from the calibrated probability
    fn predict(&self, row: ArrayView1<f64>) -> usize {
        usize::from(self.decision_function(row) > 0.0)
    }
}

fn scale_gamma(x: &Array2<f64>) -> f64 {
    let var = x.var(0.0);
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

fn rbf(a: ArrayView1<f64>, b: ArrayView1<f64>, gamma: f64) -> f64 {
    let sq: f64 = a.iter().zip(b.iter()).map(|(u, v)| (u - v) * (u - v)).sum();
    (-gamma * sq).exp()
}

/// Decision values for every training row, each produced by a model that did not see it
fn cross_validated_decisions(
    x: &Array2<f64>,
    y: &[usize],
    params: &SvmParams,
    gamma: f64,
    seed: u64,
) -> Result<Vec<f64>, ClassifierError> {
    let n = y.len();
    let folds = params.calibration_folds.clamp(2, n.max(2));
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut decisions = vec![0.0; n];
    for fold in 0..folds {
        let start = fold * n / folds;
        let end = (fold + 1) * n / folds;
        let held_out = &perm[start..end];
        let train: Vec<usize> = perm[..start].iter().chain(&perm[end..]).copied().collect();
        let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();

        let positives = y_train.iter().filter(|&&c| c == 1).count();
        if positives == 0 || positives == y_train.len() {
            // Single-class fold: the sign is all the information there is
            let value = if positives == 0 { -1.0 } else { 1.0 };
            for &i in held_out {
                decisions[i] = value;
            }
            continue;
        }

        let sub = SvmClassifier::fit_uncalibrated(&x.select(Axis(0), &train), &y_train, params, gamma)?;
        for &i in held_out {
            decisions[i] = sub.decision_function(x.row(i));
        }
    }
    Ok(decisions)
}

fn platt_probability(decision: f64, a: f64, b: f64) -> f64 {
    let f = decision * a + b;
    if f >= 0.0 {
        (-f).exp() / (1.0 + (-f).exp())
    } else {
        1.0 / (1.0 + f.exp())
    }
}

/// Platt scaling with regularized targets, Newton method with backtracking
fn fit_sigmoid(decisions: &[f64], y: &[usize]) -> (f64, f64) {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = y.iter().filter(|&&c| c == 1).count() as f64;
    let prior0 = y.len() as f64 - prior1;
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = y.iter().map(|&c| if c == 1 { hi_target } else { lo_target }).collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&targets)
            .map(|(&d, &t)| {
                let f = d * a + b;
                if f >= 0.0 {
                    t * f + (1.0 + (-f).exp()).ln()
                } else {
                    (t - 1.0) * f + (1.0 + f.exp()).ln()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&d, &t) in decisions.iter().zip(&targets) {
            let f = d * a + b;
            let (p, q) = if f >= 0.0 {
                ((-f).exp() / (1.0 + (-f).exp()), 1.0 / (1.0 + (-f).exp()))
            } else {
                (1.0 / (1.0 + f.exp()), f.exp() / (1.0 + f.exp()))
            };
            let d2 = p * q;
            h11 += d * d * d2;
            h22 += d2;
            h21 += d * d2;
            let d1 = t - p;
            g1 += d * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let (new_a, new_b) = (a + step * da, b + step * db);
            let new_f = objective(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }
        if step < MIN_STEP {
            tracing::debug!("Platt scaling line search failed");
            break;
        }
    }

    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::fixtures::{accuracy, blobs};

    #[test]
    fn test_separates_blobs() {
        let (x, y) = blobs(30, 4, 1.5, 8);
        let model = SvmClassifier::fit(&x, &y, &SvmParams::default(), 42).unwrap();

        assert!(model.n_support() > 0);
        assert!(accuracy(&model.predict_batch(x.view()), &y) > 0.9);
    }

    #[test]
    fn test_dual_constraints_hold() {
        let (x, y) = blobs(20, 3, 0.7, 2);
        let params = SvmParams::default();
        let model = SvmClassifier::fit(&x, &y, &params, 42).unwrap();

        // sum(alpha_i * y_i) == 0 and |coef| <= C
        let balance: f64 = model.dual_coef.iter().sum();
        assert!(balance.abs() < 1e-6);
        assert!(model.dual_coef.iter().all(|c| c.abs() <= params.c + 1e-9));
        assert_eq!(model.support_vectors.nrows(), model.n_support());
    }

    #[test]
    fn test_calibration_is_monotone_in_margin() {
        let (x, y) = blobs(30, 2, 1.2, 13);
        let model = SvmClassifier::fit(&x, &y, &SvmParams::default(), 42).unwrap();

        // A < 0 so larger margins mean higher class-1 probability
        assert!(model.prob_a < 0.0);
        let positive_center = ndarray::array![1.2, 1.2];
        let negative_center = ndarray::array![-1.2, -1.2];
        assert!(model.predict_proba(positive_center.view())[1] > 0.5);
        assert!(model.predict_proba(negative_center.view())[0] > 0.5);
    }

    #[test]
    fn test_sigmoid_fit_on_clean_margins() {
        let decisions = vec![-2.0, -1.5, -1.0, 1.0, 1.5, 2.0];
        let y = vec![0, 0, 0, 1, 1, 1];
        let (a, _b) = fit_sigmoid(&decisions, &y);
        assert!(a < 0.0);
    }
}
