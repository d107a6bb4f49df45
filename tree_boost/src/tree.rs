//! Regression trees grown on gradient statistics
//!
//! Each tree is fitted to the first and second derivatives of the loss at the
//! current ensemble prediction. Splits are searched exhaustively over the
//! sorted values of every candidate feature (exact greedy), and leaf weights
//! already include the learning-rate shrinkage.

use crate::matrix::FeatureMatrix;
use crate::params::BoostParams;
use serde::{Deserialize, Serialize};

/// Node of a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Terminal node holding the (shrunk) leaf weight
    Leaf { value: f64 },
    /// Internal node; rows with `x[feature] < threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// A single fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
}

/// Best split found for a node
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Gradient statistics shared by every node of the tree being grown
struct TreeBuilder<'a> {
    matrix: &'a FeatureMatrix,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a BoostParams,
}

impl RegressionTree {
    /// Fit a tree to the gradients of `rows`, searching splits over `features`
    pub fn fit(
        matrix: &FeatureMatrix,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        features: &[usize],
        params: &BoostParams,
    ) -> Self {
        let builder = TreeBuilder {
            matrix,
            grad,
            hess,
            features,
            params,
        };

        Self {
            root: builder.build(rows.to_vec(), 0),
        }
    }

    /// Tree consisting of a single leaf
    pub fn constant(value: f64) -> Self {
        Self {
            root: TreeNode::Leaf { value },
        }
    }

    /// Output of the tree for one row of feature values
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }
}

impl<'a> TreeBuilder<'a> {
    fn build(&self, rows: Vec<usize>, depth: usize) -> TreeNode {
        let (g, h) = self.sums(&rows);

        if depth >= self.params.max_depth || rows.len() < 2 {
            return self.leaf(g, h);
        }

        match self.best_split(&rows, g, h) {
            Some(split) => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .partition(|&&i| self.matrix.value(i, split.feature) < split.threshold);

                TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(self.build(left_rows, depth + 1)),
                    right: Box::new(self.build(right_rows, depth + 1)),
                }
            }
            None => self.leaf(g, h),
        }
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.grad[i], h + self.hess[i]))
    }

    fn leaf(&self, g: f64, h: f64) -> TreeNode {
        let weight = -soft_threshold(g, self.params.reg_alpha) / (h + self.params.reg_lambda);
        TreeNode::Leaf {
            value: weight * self.params.learning_rate,
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let t = soft_threshold(g, self.params.reg_alpha);
        t * t / (h + self.params.reg_lambda)
    }

    fn best_split(&self, rows: &[usize], g_total: f64, h_total: f64) -> Option<SplitCandidate> {
        let parent_score = self.score(g_total, h_total);
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();

        for &feature in self.features {
            sorted.sort_by(|&a, &b| {
                self.matrix
                    .value(a, feature)
                    .total_cmp(&self.matrix.value(b, feature))
            });

            let mut g_left = 0.0;
            let mut h_left = 0.0;

            for k in 0..sorted.len() - 1 {
                let i = sorted[k];
                g_left += self.grad[i];
                h_left += self.hess[i];

                let current = self.matrix.value(i, feature);
                let next = self.matrix.value(sorted[k + 1], feature);
                if current == next {
                    continue;
                }

                let g_right = g_total - g_left;
                let h_right = h_total - h_left;
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                    continue;
                }

                let gain = 0.5
                    * (self.score(g_left, h_left) + self.score(g_right, h_right) - parent_score)
                    - self.params.gamma;

                let improves = match &best {
                    Some(b) => gain > b.gain,
                    None => gain > 0.0,
                };
                if improves {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: midpoint(current, next),
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// L1 shrinkage of a gradient sum
fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

/// Threshold strictly above `low` and at most `high`
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid > low {
        mid
    } else {
        high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn step_matrix() -> (FeatureMatrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0]).collect();
        let labels: Vec<f64> = (0..10).map(|i| if i < 5 { 0.0 } else { 10.0 }).collect();
        let matrix = FeatureMatrix::new(vec!["x".to_string(), "noise".to_string()], rows).unwrap();
        (matrix, labels)
    }

    fn gradients(labels: &[f64], prediction: f64) -> (Vec<f64>, Vec<f64>) {
        let grad = labels.iter().map(|y| prediction - y).collect();
        let hess = vec![1.0; labels.len()];
        (grad, hess)
    }

    #[test]
    fn test_splits_step_function_on_informative_feature() {
        let (matrix, labels) = step_matrix();
        let (grad, hess) = gradients(&labels, 5.0);
        let rows: Vec<usize> = (0..10).collect();
        let params = BoostParams {
            learning_rate: 1.0,
            reg_lambda: 0.0,
            max_depth: 1,
            ..Default::default()
        };

        let tree = RegressionTree::fit(&matrix, &grad, &hess, &rows, &[0, 1], &params);

        match tree.root() {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_relative_eq!(*threshold, 4.5);
            }
            TreeNode::Leaf { .. } => panic!("expected a split"),
        }
        assert_relative_eq!(tree.predict_row(&[2.0, 0.0]), -5.0);
        assert_relative_eq!(tree.predict_row(&[7.0, 0.0]), 5.0);
    }

    #[test]
    fn test_respects_max_depth() {
        let (matrix, labels) = step_matrix();
        let (grad, hess) = gradients(&labels, 0.0);
        let rows: Vec<usize> = (0..10).collect();
        let params = BoostParams {
            max_depth: 2,
            ..Default::default()
        };

        let tree = RegressionTree::fit(&matrix, &grad, &hess, &rows, &[0], &params);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_gamma_prunes_weak_splits() {
        let (matrix, labels) = step_matrix();
        let (grad, hess) = gradients(&labels, 5.0);
        let rows: Vec<usize> = (0..10).collect();
        let params = BoostParams {
            gamma: 1e9,
            ..Default::default()
        };

        let tree = RegressionTree::fit(&matrix, &grad, &hess, &rows, &[0, 1], &params);
        assert!(tree.root().is_leaf());
    }

    #[test]
    fn test_min_child_weight_blocks_small_children() {
        let (matrix, labels) = step_matrix();
        let (grad, hess) = gradients(&labels, 5.0);
        let rows: Vec<usize> = (0..10).collect();
        let params = BoostParams {
            min_child_weight: 6.0,
            ..Default::default()
        };

        let tree = RegressionTree::fit(&matrix, &grad, &hess, &rows, &[0], &params);
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(5.0, 1.0), 4.0);
        assert_eq!(soft_threshold(-5.0, 1.0), -4.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }
}
