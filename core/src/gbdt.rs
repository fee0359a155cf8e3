//! Gradient-boosted decision trees.
//!
//! Shallow regression trees fitted to second-order gradients, one tree
//! per boosting round:
//!   1. SquaredError — residual fitting for the days regressor
//!   2. Logistic — log-odds boosting for the conversion classifier
//!
//! Split search is exact greedy: every midpoint between sorted distinct
//! feature values is scored, the first best gain wins ties. No
//! subsampling anywhere, so a fitted model is a pure function of its
//! inputs and hyperparameters. Models serialize with serde and embed the
//! [`FeatureSchema`] they were fitted against.

use crate::config::BoostParams;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};

/// L2 regularization on leaf weights.
const LAMBDA: f64 = 1.0;
/// A split must clear this gain to be kept.
const GAIN_EPSILON: f64 = 1e-12;
/// Keeps the log-odds prior finite on one-class data.
const PROB_FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    SquaredError,
    Logistic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn output(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { value } => return *value,
            }
        }
    }
}

/// A fitted boosted-tree model. Leaf values carry the learning rate
/// already applied, so prediction is base score plus tree outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gbdt {
    objective:  Objective,
    schema:     FeatureSchema,
    base_score: f64,
    trees:      Vec<Tree>,
}

impl Gbdt {
    /// Fit `params.rounds` trees against the labels.
    ///
    /// Labels are raw values for SquaredError and 0.0/1.0 for Logistic.
    /// Every row must match the schema width; the caller assembles rows
    /// through the schema, so a mismatch is a programming error.
    pub fn fit(
        objective: Objective,
        schema: FeatureSchema,
        rows: &[Vec<f64>],
        labels: &[f64],
        params: &BoostParams,
    ) -> Self {
        assert_eq!(rows.len(), labels.len(), "row/label count mismatch");
        assert!(!rows.is_empty(), "cannot fit on an empty table");
        assert_eq!(
            rows[0].len(),
            schema.width(),
            "row width must match the schema"
        );

        let base_score = match objective {
            Objective::SquaredError => mean(labels),
            Objective::Logistic => {
                let p = mean(labels).clamp(PROB_FLOOR, 1.0 - PROB_FLOOR);
                (p / (1.0 - p)).ln()
            }
        };

        let mut scores = vec![base_score; rows.len()];
        let mut trees = Vec::with_capacity(params.rounds);

        for _ in 0..params.rounds {
            let (grads, hessians) = gradients(objective, &scores, labels);
            let builder = TreeBuilder {
                rows,
                grads: &grads,
                hessians: &hessians,
                max_depth: params.max_depth,
                min_samples_leaf: params.min_samples_leaf,
                learning_rate: params.learning_rate,
                nodes: Vec::new(),
            };
            let tree = builder.build();
            for (score, row) in scores.iter_mut().zip(rows) {
                *score += tree.output(row);
            }
            trees.push(tree);
        }

        Self {
            objective,
            schema,
            base_score,
            trees,
        }
    }

    /// Predict one row: a probability for Logistic, a raw value for
    /// SquaredError. The row must match the schema width.
    pub fn predict(&self, features: &[f64]) -> f64 {
        assert_eq!(
            features.len(),
            self.schema.width(),
            "feature width must match the schema"
        );
        let raw = self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.output(features))
                .sum::<f64>();
        match self.objective {
            Objective::SquaredError => raw,
            Objective::Logistic => sigmoid(raw),
        }
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

fn gradients(objective: Objective, scores: &[f64], labels: &[f64]) -> (Vec<f64>, Vec<f64>) {
    match objective {
        Objective::SquaredError => {
            let grads = scores.iter().zip(labels).map(|(f, y)| f - y).collect();
            let hessians = vec![1.0; scores.len()];
            (grads, hessians)
        }
        Objective::Logistic => {
            let mut grads = Vec::with_capacity(scores.len());
            let mut hessians = Vec::with_capacity(scores.len());
            for (f, y) in scores.iter().zip(labels) {
                let p = sigmoid(*f);
                grads.push(p - y);
                hessians.push(p * (1.0 - p));
            }
            (grads, hessians)
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

struct SplitCandidate {
    feature:   usize,
    threshold: f64,
    gain:      f64,
}

struct TreeBuilder<'a> {
    rows:             &'a [Vec<f64>],
    grads:            &'a [f64],
    hessians:         &'a [f64],
    max_depth:        usize,
    min_samples_leaf: usize,
    learning_rate:    f64,
    nodes:            Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(mut self) -> Tree {
        let indices: Vec<usize> = (0..self.rows.len()).collect();
        self.grow(&indices, 0);
        Tree { nodes: self.nodes }
    }

    /// Grow one node for `indices`, returning its index in the arena.
    fn grow(&mut self, indices: &[usize], depth: usize) -> usize {
        if depth < self.max_depth && indices.len() >= 2 * self.min_samples_leaf.max(1) {
            if let Some(split) = self.best_split(indices) {
                let node_index = self.nodes.len();
                // Placeholder so children land after their parent.
                self.nodes.push(Node::Leaf { value: 0.0 });

                let mut left_rows = Vec::new();
                let mut right_rows = Vec::new();
                for &i in indices {
                    if self.rows[i][split.feature] <= split.threshold {
                        left_rows.push(i);
                    } else {
                        right_rows.push(i);
                    }
                }

                let left = self.grow(&left_rows, depth + 1);
                let right = self.grow(&right_rows, depth + 1);
                self.nodes[node_index] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                return node_index;
            }
        }

        let node_index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(indices),
        });
        node_index
    }

    fn leaf_value(&self, indices: &[usize]) -> f64 {
        let g: f64 = indices.iter().map(|&i| self.grads[i]).sum();
        let h: f64 = indices.iter().map(|&i| self.hessians[i]).sum();
        self.learning_rate * (-g / (h + LAMBDA))
    }

    /// Exact greedy search over every feature and every midpoint between
    /// sorted distinct values. Ties keep the first candidate found, so
    /// the chosen split never depends on anything but the inputs.
    fn best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let total_g: f64 = indices.iter().map(|&i| self.grads[i]).sum();
        let total_h: f64 = indices.iter().map(|&i| self.hessians[i]).sum();
        let parent_score = total_g * total_g / (total_h + LAMBDA);
        let width = self.rows[indices[0]].len();
        let min_leaf = self.min_samples_leaf.max(1);

        let mut best: Option<SplitCandidate> = None;
        for feature in 0..width {
            let mut ordered: Vec<(f64, f64, f64)> = indices
                .iter()
                .map(|&i| (self.rows[i][feature], self.grads[i], self.hessians[i]))
                .collect();
            ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_g = 0.0;
            let mut left_h = 0.0;
            for i in 0..ordered.len() - 1 {
                left_g += ordered[i].1;
                left_h += ordered[i].2;
                // Equal neighbors cannot be separated by a threshold.
                if ordered[i].0 >= ordered[i + 1].0 {
                    continue;
                }
                let left_count = i + 1;
                let right_count = ordered.len() - left_count;
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }
                let right_g = total_g - left_g;
                let right_h = total_h - left_h;
                let gain = left_g * left_g / (left_h + LAMBDA)
                    + right_g * right_g / (right_h + LAMBDA)
                    - parent_score;
                if gain > GAIN_EPSILON && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (ordered[i].0 + ordered[i + 1].0) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}
