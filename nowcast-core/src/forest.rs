//! Bagged regression trees.
//!
//! Each tree is a CART regressor grown on squared error until its leaves are
//! pure (or a size/depth limit stops it). The forest fits every tree on a
//! bootstrap resample of the training rows and averages their predictions.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, PredictError};

/// Forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows every tree until its leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<(), FitError> {
        if self.n_trees == 0 {
            return Err(FitError::InvalidParams("n_trees must be at least 1".into()));
        }
        check_min_samples_split(self.min_samples_split)
    }
}

fn check_min_samples_split(min_samples_split: usize) -> Result<(), FitError> {
    if min_samples_split < 2 {
        return Err(FitError::InvalidParams("min_samples_split must be at least 2".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

struct Split {
    feature: usize,
    threshold: f64,
}

/// A single regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fit one tree on every row.
    pub fn fit<R: AsRef<[f64]>>(
        rows: &[R],
        targets: &[f64],
        max_depth: Option<usize>,
        min_samples_split: usize,
    ) -> Result<Self, FitError> {
        check_min_samples_split(min_samples_split)?;
        let n_features = check_training_data(rows, targets)?;
        let indices: Vec<usize> = (0..rows.len()).collect();
        Ok(Self::grow(rows, targets, n_features, indices, max_depth, min_samples_split))
    }

    /// Check the node graph read back from disk: every split routes a row of
    /// `n_features` values forward to an existing node, and leaves are finite.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(format!("node {idx}: non-finite leaf value"));
                }
                Node::Leaf { .. } => {}
                Node::Split { feature, threshold, left, right } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {idx}: feature {feature} out of range for {n_features} features"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx}: non-finite threshold"));
                    }
                    // Children always follow their parent, so traversal terminates.
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx}: invalid child index {child}"));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn grow<R: AsRef<[f64]>>(
        rows: &[R],
        targets: &[f64],
        n_features: usize,
        indices: Vec<usize>,
        max_depth: Option<usize>,
        min_samples_split: usize,
    ) -> Self {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut pending = vec![(0usize, indices, 0usize)];

        while let Some((slot, indices, depth)) = pending.pop() {
            let can_split = indices.len() >= min_samples_split
                && max_depth.is_none_or(|limit| depth < limit);
            let split = if can_split {
                best_split(rows, targets, &indices, n_features)
            } else {
                None
            };

            let Some(Split { feature, threshold }) = split else {
                nodes[slot] = Node::Leaf { value: mean_target(targets, &indices) };
                continue;
            };

            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| rows[i].as_ref()[feature] <= threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[slot] = Node::Split { feature, threshold, left, right };

            pending.push((right, right_indices, depth + 1));
            pending.push((left, left_indices, depth + 1));
        }

        Self { nodes }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }
}

fn mean_target(targets: &[f64], indices: &[usize]) -> f64 {
    let sum: f64 = indices.iter().map(|&i| targets[i]).sum();
    sum / indices.len() as f64
}

/// Find the split that most reduces squared error, if any reduces it at all.
///
/// Minimising the children's squared error is the same as maximising
/// `sum_l^2 / n_l + sum_r^2 / n_r`, which needs only running sums.
fn best_split<R: AsRef<[f64]>>(
    rows: &[R],
    targets: &[f64],
    indices: &[usize],
    n_features: usize,
) -> Option<Split> {
    let first = targets[indices[0]];
    if indices.iter().all(|&i| targets[i] == first) {
        return None;
    }

    let n = indices.len() as f64;
    let total: f64 = indices.iter().map(|&i| targets[i]).sum();
    let parent_score = total * total / n;

    let mut best: Option<(f64, Split)> = None;
    let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(indices.len());

    for feature in 0..n_features {
        sorted.clear();
        sorted.extend(indices.iter().map(|&i| (rows[i].as_ref()[feature], targets[i])));
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for k in 0..sorted.len() - 1 {
            left_sum += sorted[k].1;
            let (value, next) = (sorted[k].0, sorted[k + 1].0);
            if value == next {
                continue;
            }

            let left_n = (k + 1) as f64;
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / left_n + right_sum * right_sum / (n - left_n);

            if best.as_ref().is_none_or(|(best_score, _)| score > *best_score) {
                best = Some((score, Split { feature, threshold: midpoint(value, next) }));
            }
        }
    }

    best.filter(|(score, _)| *score > parent_score).map(|(_, split)| split)
}

/// A threshold `t` with `low <= t < high`.
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid < high { mid } else { low }
}

/// Validate a training matrix and return its feature count.
fn check_training_data<R: AsRef<[f64]>>(rows: &[R], targets: &[f64]) -> Result<usize, FitError> {
    if rows.is_empty() {
        return Err(FitError::EmptyDataset);
    }
    if rows.len() != targets.len() {
        return Err(FitError::LengthMismatch { rows: rows.len(), targets: targets.len() });
    }

    let expected = rows[0].as_ref().len();
    if expected == 0 {
        return Err(FitError::InvalidParams("rows must have at least one feature".into()));
    }

    for (row, (values, target)) in rows.iter().zip(targets).enumerate() {
        let values = values.as_ref();
        if values.len() != expected {
            return Err(FitError::RaggedRow { row, expected, found: values.len() });
        }
        if !target.is_finite() || values.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite { row });
        }
    }

    Ok(expected)
}

/// Bootstrap-aggregated regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit `params.n_trees` trees, each on its own bootstrap resample.
    pub fn fit<R: AsRef<[f64]>>(
        rows: &[R],
        targets: &[f64],
        params: &ForestParams,
    ) -> Result<Self, FitError> {
        params.validate()?;
        let n_features = check_training_data(rows, targets)?;
        let n = rows.len();

        let mut seeder = ChaCha8Rng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);

        for tree_idx in 0..params.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(seeder.next_u64());
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

            let tree = RegressionTree::grow(
                rows,
                targets,
                n_features,
                sample,
                params.max_depth,
                params.min_samples_split,
            );
            tracing::debug!(tree = tree_idx, nodes = tree.node_count(), "fitted tree");
            trees.push(tree);
        }

        Ok(Self { params: *params, n_features, trees })
    }

    /// Mean prediction of all trees for one row.
    pub fn predict(&self, row: &[f64]) -> Result<f64, PredictError> {
        if row.len() != self.n_features {
            return Err(PredictError::FeatureCount { expected: self.n_features, found: row.len() });
        }
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn predict_many<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Vec<f64>, PredictError> {
        rows.iter().map(|row| self.predict(row.as_ref())).collect()
    }

    /// Structural check for a forest that did not come from [`RandomForest::fit`].
    pub fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("forest expects zero features".into());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features).map_err(|e| format!("tree {idx}: {e}"))?;
        }
        Ok(())
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}
