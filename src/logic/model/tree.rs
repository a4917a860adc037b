//! CART decision tree with Gini impurity

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{Classifier, Probabilities};
use crate::logic::label::CLASS_COUNT;

#[derive(Debug, Clone)]
pub struct TreeParams {
    /// None grows until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features examined per split; None examines all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        proba: Probabilities,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Nodes are stored flat; index 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    params: &'a TreeParams,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Highest feature index any split reads
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    pub fn fit(x: &Array2<f64>, y: &[usize], params: &TreeParams, seed: u64) -> Self {
        let samples: Vec<usize> = (0..y.len()).collect();
        Self::fit_on(x, y, samples, params, StdRng::seed_from_u64(seed))
    }

    /// Fit on a subset of rows; duplicates act as sample weights
    pub(crate) fn fit_on(
        x: &Array2<f64>,
        y: &[usize],
        samples: Vec<usize>,
        params: &TreeParams,
        rng: StdRng,
    ) -> Self {
        let mut builder = Builder {
            x,
            y,
            params,
            rng,
            nodes: Vec::new(),
        };
        builder.grow(samples, 0);
        Self { nodes: builder.nodes }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], i: usize) -> usize {
            match &nodes[i] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

impl Classifier for DecisionTree {
    fn predict_proba(&self, row: ArrayView1<f64>) -> Probabilities {
        let mut i = 0;
        loop {
            match self.nodes.get(i) {
                None => return [1.0 / CLASS_COUNT as f64; CLASS_COUNT],
                Some(Node::Leaf { proba }) => return *proba,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    i = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

impl Builder<'_> {
    /// Returns the index of the created node
    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let counts = class_counts(self.y, &samples);
        let n = samples.len();

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || depth_reached || n < self.params.min_samples_split {
            return self.leaf(&counts, n);
        }

        let Some((feature, threshold)) = self.best_split(&samples, &counts) else {
            return self.leaf(&counts, n);
        };

        let (left, right): (Vec<usize>, Vec<usize>) =
            samples.into_iter().partition(|&i| self.x[[i, feature]] <= threshold);

        // Reserve the slot so children get higher indices
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { proba: [0.0; CLASS_COUNT] });
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[index] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        index
    }

    fn leaf(&mut self, counts: &[usize; CLASS_COUNT], n: usize) -> usize {
        let mut proba = [0.0; CLASS_COUNT];
        for (p, &c) in proba.iter_mut().zip(counts) {
            *p = c as f64 / n.max(1) as f64;
        }
        self.nodes.push(Node::Leaf { proba });
        self.nodes.len() - 1
    }

    /// Best (feature, threshold) by weighted Gini decrease; first found wins ties
    fn best_split(&mut self, samples: &[usize], counts: &[usize; CLASS_COUNT]) -> Option<(usize, f64)> {
        let n_features = self.x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        if let Some(k) = self.params.max_features {
            features.shuffle(&mut self.rng);
            features.truncate(k.clamp(1, n_features));
        }

        let n = samples.len() as f64;
        let parent = gini(counts, samples.len());
        let mut best: Option<(usize, f64)> = None;
        let mut best_gain = 1e-12;

        let mut order: Vec<usize> = samples.to_vec();
        for &feature in &features {
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut left = [0usize; CLASS_COUNT];
            for pos in 0..order.len() - 1 {
                left[self.y[order[pos]]] += 1;
                let here = self.x[[order[pos], feature]];
                let next = self.x[[order[pos + 1], feature]];
                if here == next {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = order.len() - n_left;
                let mut right = *counts;
                for (r, l) in right.iter_mut().zip(&left) {
                    *r -= l;
                }

                let child = (n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right)) / n;
                let gain = parent - child;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature, (here + next) / 2.0));
                }
            }
        }
        best
    }
}

fn class_counts(y: &[usize], samples: &[usize]) -> [usize; CLASS_COUNT] {
    let mut counts = [0usize; CLASS_COUNT];
    for &i in samples {
        counts[y[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize; CLASS_COUNT], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}
