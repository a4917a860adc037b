//! Bagged ensemble of CART trees

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, TreeParams};
use super::{Classifier, Probabilities};
use crate::logic::label::CLASS_COUNT;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            bootstrap: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(x: &Array2<f64>, y: &[usize], params: &ForestParams, seed: u64) -> Self {
        let n = y.len();
        let tree_params = TreeParams {
            max_features: Some(((x.ncols() as f64).sqrt() as usize).max(1)),
            ..Default::default()
        };

        // One master stream hands out per-tree seeds, so tree k is the same
        // regardless of how many trees are grown
        let mut master = StdRng::seed_from_u64(seed);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.gen());
                let samples: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit_on(x, y, samples, &tree_params, rng)
            })
            .collect();

        Self { trees }
    }
}

impl Classifier for RandomForest {
    fn predict_proba(&self, row: ArrayView1<f64>) -> Probabilities {
        let mut total = [0.0; CLASS_COUNT];
        for tree in &self.trees {
            for (t, p) in total.iter_mut().zip(tree.predict_proba(row)) {
                *t += p;
            }
        }
        let k = self.trees.len().max(1) as f64;
        total.map(|t| t / k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::fixtures::{accuracy, blobs};

    #[test]
    fn test_forest_beats_chance_on_held_out_blobs() {
        let (x, y) = blobs(40, 5, 1.0, 21);
        let (x_test, y_test) = blobs(20, 5, 1.0, 22);
        let forest = RandomForest::fit(&x, &y, &ForestParams::default(), 42);

        assert_eq!(forest.trees.len(), 100);
        assert!(accuracy(&forest.predict_batch(x_test.view()), &y_test) > 0.8);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs(20, 3, 0.8, 4);
        let params = ForestParams {
            n_estimators: 10,
            ..Default::default()
        };
        let a = RandomForest::fit(&x, &y, &params, 42);
        let b = RandomForest::fit(&x, &y, &params, 42);
        for row in x.rows() {
            assert_eq!(a.predict_proba(row), b.predict_proba(row));
        }
    }
}
