//! L2-penalized binary logistic regression fitted by Newton iterations

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{linalg, sigmoid, Classifier, Probabilities};

#[derive(Debug, Clone)]
pub struct LogisticParams {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub n_iter: usize,
}

impl LogisticRegression {
    /// Minimize `0.5 * |w|^2 + C * sum(log-loss)`; the intercept is not penalized
    pub fn fit(x: &Array2<f64>, y: &[usize], params: &LogisticParams) -> Self {
        let (n, d) = x.dim();
        let targets: Array1<f64> = y.iter().map(|&c| c as f64).collect();

        // Augmented design matrix with a trailing bias column
        let mut xa = Array2::ones((n, d + 1));
        xa.slice_mut(ndarray::s![.., ..d]).assign(x);

        let mut beta = Array1::<f64>::zeros(d + 1);
        let mut n_iter = 0;

        for iter in 0..params.max_iter {
            n_iter = iter + 1;
            let z = xa.dot(&beta);
            let p = z.mapv(sigmoid);
            let s = p.mapv(|v| v * (1.0 - v));

            let mut grad = xa.t().dot(&(&p - &targets)) * params.c;
            let weighted = &xa * &s.view().insert_axis(ndarray::Axis(1));
            let mut hess = xa.t().dot(&weighted) * params.c;
            for j in 0..d {
                grad[j] += beta[j];
                hess[[j, j]] += 1.0;
            }
            hess[[d, d]] += 1e-10;

            let step = match linalg::solve(&hess, &grad) {
                Some(step) => step,
                None => {
                    tracing::warn!("Logistic regression Hessian is singular, stopping at iteration {}", n_iter);
                    break;
                }
            };
            beta -= &step;

            if step.iter().fold(0.0f64, |m, v| m.max(v.abs())) < params.tol {
                break;
            }
        }

        Self {
            weights: beta.slice(ndarray::s![..d]).to_vec(),
            intercept: beta[d],
            n_iter,
        }
    }

    pub fn decision_function(&self, row: ArrayView1<f64>) -> f64 {
        row.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f64>() + self.intercept
    }
}

impl Classifier for LogisticRegression {
    fn predict_proba(&self, row: ArrayView1<f64>) -> Probabilities {
        let p1 = sigmoid(self.decision_function(row));
        [1.0 - p1, p1]
    }
}
