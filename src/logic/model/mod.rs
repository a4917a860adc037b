//! Model Module - Candidate classifiers
//!
//! Every candidate is fitted on the scaled training split and answers with a
//! class ordinal and a two-class probability distribution.
//! `TrainedModel` is the closed set that can be persisted and served.

pub mod forest;
pub mod linalg;
pub mod logistic;
pub mod mlp;
pub mod svm;
pub mod tree;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::logic::label::CLASS_COUNT;

pub use forest::RandomForest;
pub use logistic::LogisticRegression;
pub use mlp::MlpClassifier;
pub use svm::SvmClassifier;
pub use tree::DecisionTree;

/// Two-class probability distribution, indexed by class ordinal
pub type Probabilities = [f64; CLASS_COUNT];

/// Trait for fitted classifiers
pub trait Classifier {
    /// Class probabilities for one scaled row
    fn predict_proba(&self, row: ArrayView1<f64>) -> Probabilities;

    /// Predicted class ordinal for one scaled row
    fn predict(&self, row: ArrayView1<f64>) -> usize {
        argmax(&self.predict_proba(row))
    }

    fn predict_batch(&self, x: ArrayView2<f64>) -> Vec<usize> {
        x.rows().into_iter().map(|row| self.predict(row)).collect()
    }
}

/// Index of the highest probability; the lower ordinal wins ties
pub fn argmax(p: &Probabilities) -> usize {
    let mut best = 0;
    for (i, &v) in p.iter().enumerate() {
        if v > p[best] {
            best = i;
        }
    }
    best
}

/// Candidate families, in the order they are trained and ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Svm,
    RandomForest,
    LogisticRegression,
    DecisionTree,
    NeuralNetwork,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Svm,
        ModelKind::RandomForest,
        ModelKind::LogisticRegression,
        ModelKind::DecisionTree,
        ModelKind::NeuralNetwork,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Svm => "SVM",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::NeuralNetwork => "Neural Network",
        }
    }

    /// File-name friendly form
    pub fn slug(self) -> &'static str {
        match self {
            ModelKind::Svm => "svm",
            ModelKind::RandomForest => "random_forest",
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::NeuralNetwork => "neural_network",
        }
    }

    /// Fit this family on a scaled training split
    pub fn fit(self, x: &Array2<f64>, y: &[usize], seed: u64) -> Result<TrainedModel, ClassifierError> {
        let model = match self {
            ModelKind::Svm => TrainedModel::Svm(SvmClassifier::fit(x, y, &svm::SvmParams::default(), seed)?),
            ModelKind::RandomForest => {
                TrainedModel::RandomForest(RandomForest::fit(x, y, &forest::ForestParams::default(), seed))
            }
            ModelKind::LogisticRegression => {
                TrainedModel::LogisticRegression(LogisticRegression::fit(x, y, &logistic::LogisticParams::default()))
            }
            ModelKind::DecisionTree => {
                TrainedModel::DecisionTree(DecisionTree::fit(x, y, &tree::TreeParams::default(), seed))
            }
            ModelKind::NeuralNetwork => {
                TrainedModel::NeuralNetwork(MlpClassifier::fit(x, y, &mlp::MlpParams::default(), seed))
            }
        };
        Ok(model)
    }
}

/// A fitted candidate of any family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum TrainedModel {
    Svm(SvmClassifier),
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    NeuralNetwork(MlpClassifier),
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::Svm(_) => ModelKind::Svm,
            TrainedModel::RandomForest(_) => ModelKind::RandomForest,
            TrainedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
            TrainedModel::DecisionTree(_) => ModelKind::DecisionTree,
            TrainedModel::NeuralNetwork(_) => ModelKind::NeuralNetwork,
        }
    }

    /// Width of the input rows the model was fitted on. Trees only bound it
    /// from below by the highest feature they split on; `None` means the
    /// model never looks at any feature.
    pub fn n_features(&self) -> Option<usize> {
        match self {
            TrainedModel::Svm(m) => Some(m.support_vectors.ncols()),
            TrainedModel::RandomForest(m) => m.trees.iter().filter_map(DecisionTree::max_feature).max().map(|f| f + 1),
            TrainedModel::LogisticRegression(m) => Some(m.weights.len()),
            TrainedModel::DecisionTree(m) => m.max_feature().map(|f| f + 1),
            TrainedModel::NeuralNetwork(m) => m.layers.first().map(|l| l.weights.nrows()),
        }
    }

    /// Whether rows of `width` features can be fed to this model
    pub fn accepts_width(&self, width: usize) -> bool {
        match (self, self.n_features()) {
            (TrainedModel::RandomForest(_) | TrainedModel::DecisionTree(_), Some(needed)) => needed <= width,
            (_, Some(n)) => n == width,
            (_, None) => true,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::Svm(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::NeuralNetwork(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn predict_proba(&self, row: ArrayView1<f64>) -> Probabilities {
        self.inner().predict_proba(row)
    }

    fn predict(&self, row: ArrayView1<f64>) -> usize {
        self.inner().predict(row)
    }
}

/// Logistic function, stable for large |z|
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
