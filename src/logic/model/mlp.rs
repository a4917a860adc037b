//! Feed-forward neural network classifier
//!
//! ReLU hidden layers, single sigmoid output unit, binary cross-entropy with
//! L2 penalty, trained by mini-batch Adam.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{sigmoid, Classifier, Probabilities};

#[derive(Debug, Clone)]
pub struct MlpParams {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    /// L2 penalty
    pub alpha: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    pub tol: f64,
    /// Epochs without `tol` improvement before stopping
    pub patience: usize,
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100, 50],
            learning_rate: 1e-3,
            alpha: 1e-4,
            batch_size: 200,
            max_epochs: 1000,
            tol: 1e-4,
            patience: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    /// Hidden layers followed by the output layer
    pub layers: Vec<Layer>,
    pub epochs: usize,
    pub final_loss: f64,
}

/// Adam moment estimates for one layer
struct Moments {
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;

impl MlpClassifier {
    pub fn fit(x: &Array2<f64>, y: &[usize], params: &MlpParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = x.nrows();

        let mut sizes = vec![x.ncols()];
        sizes.extend(&params.hidden_layers);
        sizes.push(1);

        let mut layers: Vec<Layer> = sizes
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let is_output = i == sizes.len() - 2;
                glorot_layer(w[0], w[1], is_output, &mut rng)
            })
            .collect();
        let mut moments: Vec<Moments> = layers
            .iter()
            .map(|l| Moments {
                m_w: Array2::zeros(l.weights.raw_dim()),
                v_w: Array2::zeros(l.weights.raw_dim()),
                m_b: Array1::zeros(l.bias.len()),
                v_b: Array1::zeros(l.bias.len()),
            })
            .collect();

        let targets: Array1<f64> = y.iter().map(|&c| c as f64).collect();
        let batch_size = params.batch_size.clamp(1, n.max(1));
        let mut order: Vec<usize> = (0..n).collect();

        let mut step = 0i32;
        let mut best_loss = f64::INFINITY;
        let mut stalled = 0;
        let mut epochs = 0;
        let mut final_loss = f64::INFINITY;

        for _ in 0..params.max_epochs {
            epochs += 1;
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = targets.select(Axis(0), batch);
                step += 1;
                epoch_loss += train_batch(&mut layers, &mut moments, &xb, &yb, params, step) * batch.len() as f64;
            }

            epoch_loss /= n as f64;
            final_loss = epoch_loss;

            if epoch_loss > best_loss - params.tol {
                stalled += 1;
            } else {
                stalled = 0;
            }
            best_loss = best_loss.min(epoch_loss);
            if stalled > params.patience {
                tracing::debug!("MLP converged after {} epochs (loss {:.5})", epochs, epoch_loss);
                break;
            }
        }

        Self {
            layers,
            epochs,
            final_loss,
        }
    }

    fn forward_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut activation = row.to_owned();
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let z = activation.dot(&layer.weights) + &layer.bias;
            activation = if i == last { z } else { z.mapv(relu) };
        }
        sigmoid(activation[0])
    }
}

impl Classifier for MlpClassifier {
    fn predict_proba(&self, row: ArrayView1<f64>) -> Probabilities {
        let p1 = self.forward_row(row);
        [1.0 - p1, p1]
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

fn glorot_layer(fan_in: usize, fan_out: usize, is_output: bool, rng: &mut StdRng) -> Layer {
    // Sigmoid output units use the narrower bound
    let factor = if is_output { 2.0 } else { 6.0 };
    let bound = (factor / (fan_in + fan_out) as f64).sqrt();
    Layer {
        weights: Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..bound)),
        bias: Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound)),
    }
}

/// One forward/backward pass and Adam update; returns the penalized batch loss
fn train_batch(
    layers: &mut [Layer],
    moments: &mut [Moments],
    xb: &Array2<f64>,
    yb: &Array1<f64>,
    params: &MlpParams,
    step: i32,
) -> f64 {
    let m = xb.nrows() as f64;
    let last = layers.len() - 1;

    // Forward, keeping every layer's activation
    let mut activations: Vec<Array2<f64>> = vec![xb.clone()];
    for (i, layer) in layers.iter().enumerate() {
        let z = activations[i].dot(&layer.weights) + &layer.bias;
        activations.push(if i == last { z.mapv(sigmoid) } else { z.mapv(relu) });
    }

    let output = activations[last + 1].column(0).to_owned();
    let loss: f64 = output
        .iter()
        .zip(yb)
        .map(|(&p, &t)| {
            let p = p.clamp(1e-12, 1.0 - 1e-12);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / m;
    let penalty: f64 = layers.iter().map(|l| l.weights.iter().map(|w| w * w).sum::<f64>()).sum::<f64>()
        * params.alpha
        / (2.0 * m);

    // Backward: sigmoid + cross-entropy gives (p - t) at the output
    let mut delta: Array2<f64> = (&output - yb).insert_axis(Axis(1)) / m;
    let bias_correction1 = 1.0 - BETA1.powi(step);
    let bias_correction2 = 1.0 - BETA2.powi(step);

    for i in (0..layers.len()).rev() {
        let grad_w = activations[i].t().dot(&delta) + &layers[i].weights * (params.alpha / m);
        let grad_b = delta.sum_axis(Axis(0));

        let next_delta = if i > 0 {
            let back = delta.dot(&layers[i].weights.t());
            let mask = activations[i].mapv(|a| if a > 0.0 { 1.0 } else { 0.0 });
            Some(back * mask)
        } else {
            None
        };

        let mom = &mut moments[i];
        mom.m_w = &mom.m_w * BETA1 + &grad_w * (1.0 - BETA1);
        mom.v_w = &mom.v_w * BETA2 + &grad_w.mapv(|g| g * g) * (1.0 - BETA2);
        mom.m_b = &mom.m_b * BETA1 + &grad_b * (1.0 - BETA1);
        mom.v_b = &mom.v_b * BETA2 + &grad_b.mapv(|g| g * g) * (1.0 - BETA2);

        let lr = params.learning_rate;
        let layer = &mut layers[i];
        ndarray::Zip::from(&mut layer.weights)
            .and(&mom.m_w)
            .and(&mom.v_w)
            .for_each(|w, &mw, &vw| {
                *w -= lr * (mw / bias_correction1) / ((vw / bias_correction2).sqrt() + ADAM_EPS);
            });
        ndarray::Zip::from(&mut layer.bias)
            .and(&mom.m_b)
            .and(&mom.v_b)
            .for_each(|b, &mb, &vb| {
                *b -= lr * (mb / bias_correction1) / ((vb / bias_correction2).sqrt() + ADAM_EPS);
            });

        if let Some(d) = next_delta {
            delta = d;
        }
    }

    loss + penalty
}
