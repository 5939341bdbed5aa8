use std::collections::BTreeMap;

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::model::{
    ClassSet, DecisionTree, FOREST_MODEL_VERSION, ForestError, RandomForest, TreeNode,
};

/// Forest hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of trees.
    pub n_estimators: usize,
    /// Maximum tree depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum rows required to split a node.
    pub min_samples_split: usize,
    /// Seed for bootstrap sampling and feature selection.
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Map numeric class values to output positions in ascending order.
pub fn encode_targets<T: Ord + Clone>(values: &[T]) -> (Vec<T>, Vec<usize>) {
    let positions: BTreeMap<T, usize> = values
        .iter()
        .cloned()
        .map(|v| (v, 0usize))
        .collect::<BTreeMap<_, _>>()
        .into_keys()
        .enumerate()
        .map(|(pos, v)| (v, pos))
        .collect();
    let classes = positions.keys().cloned().collect();
    let targets = values.iter().map(|v| positions[v]).collect();
    (classes, targets)
}

/// Train a random forest on `x` with targets given as positions into `classes`.
pub fn train_forest<'a>(
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    classes: ClassSet,
    options: &TrainOptions,
) -> Result<RandomForest, ForestError> {
    let (n, d) = x.dim();
    if n == 0 || d == 0 {
        return Err(ForestError::EmptyDataset);
    }
    if n != y.len() {
        return Err(ForestError::MismatchedLengths {
            rows: n,
            targets: y.len(),
        });
    }
    if options.n_estimators == 0 {
        return Err(ForestError::InvalidOptions(
            "n_estimators must be at least 1".to_string(),
        ));
    }
    if d > u16::MAX as usize {
        return Err(ForestError::InvalidOptions(format!(
            "{d} features exceed the supported maximum"
        )));
    }
    let n_classes = classes.len();
    if let Some(&target) = y.iter().find(|&&t| t >= n_classes) {
        return Err(ForestError::TargetOutOfRange {
            target,
            classes: n_classes,
        });
    }
    for (feature, column) in x.columns().into_iter().enumerate() {
        if column.iter().any(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteInput { feature });
        }
    }

    let max_features = ((d as f64).sqrt() as usize).max(1);
    let min_samples_split = options.min_samples_split.max(2);
    let mut trees = Vec::with_capacity(options.n_estimators);
    for tree_idx in 0..options.n_estimators {
        let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(tree_idx as u64));
        let mut sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            max_features,
            max_depth: options.max_depth,
            min_samples_split,
            rng,
            nodes: Vec::new(),
        };
        builder.grow(&mut sample, 0);
        trees.push(DecisionTree {
            nodes: builder.nodes,
        });
    }
    tracing::debug!(
        trees = trees.len(),
        classes = n_classes,
        rows = n,
        "Trained random forest"
    );

    Ok(RandomForest {
        model_version: FOREST_MODEL_VERSION,
        n_features: d,
        classes,
        trees,
    })
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    rng: StdRng,
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    /// Weighted child impurity `n_left * gini_left + n_right * gini_right`.
    score: f64,
    feature: usize,
    threshold: f64,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `rows` and return its node index.
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> u32 {
        let node_idx = self.nodes.len();
        let counts = self.class_counts(rows);
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if is_pure || depth_reached || rows.len() < self.min_samples_split {
            self.nodes.push(leaf(&counts, rows.len()));
            return node_idx as u32;
        }
        let Some(split) = self.find_split(rows) else {
            self.nodes.push(leaf(&counts, rows.len()));
            return node_idx as u32;
        };

        // Placeholder; children are appended after it in pre-order.
        self.nodes.push(TreeNode::Leaf {
            distribution: Vec::new(),
        });
        let boundary = partition(rows, |row| self.x[[row, split.feature]] <= split.threshold);
        let (left_rows, right_rows) = rows.split_at_mut(boundary);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[node_idx] = TreeNode::Split {
            feature: split.feature as u16,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx as u32
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &row in rows {
            counts[self.y[row]] += 1;
        }
        counts
    }

    /// Best split over a random feature subset.
    ///
    /// Features are visited in random order; at least `max_features` are
    /// evaluated and the search continues past that only while no feature
    /// has produced a usable split.
    fn find_split(&mut self, rows: &[usize]) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);
        let mut best: Option<BestSplit> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_for_feature(rows, feature) {
                if best.is_none_or(|b| candidate.score < b.score) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_split_for_feature(&self, rows: &[usize], feature: usize) -> Option<BestSplit> {
        let mut sorted: Vec<(f64, usize)> = rows
            .iter()
            .map(|&row| (self.x[[row, feature]], self.y[row]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = rows.len();
        let mut right_counts = vec![0u32; self.n_classes];
        for &(_, class) in &sorted {
            right_counts[class] += 1;
        }
        let mut left_counts = vec![0u32; self.n_classes];

        let mut best: Option<BestSplit> = None;
        for i in 0..total - 1 {
            let (value, class) = sorted[i];
            left_counts[class] += 1;
            right_counts[class] -= 1;
            let next = sorted[i + 1].0;
            if next <= value {
                continue;
            }
            let n_left = i + 1;
            let score = weighted_gini(&left_counts, n_left)
                + weighted_gini(&right_counts, total - n_left);
            if best.is_none_or(|b| score < b.score) {
                let mut threshold = value + (next - value) / 2.0;
                // Midpoint can round up to `next` for adjacent floats.
                if threshold >= next {
                    threshold = value;
                }
                best = Some(BestSplit {
                    score,
                    feature,
                    threshold,
                });
            }
        }
        best
    }
}

/// `n * gini` for a node with the given class counts.
fn weighted_gini(counts: &[u32], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    n - sum_sq / n
}

fn leaf(counts: &[u32], n: usize) -> TreeNode {
    let total = n.max(1) as f32;
    TreeNode::Leaf {
        distribution: counts.iter().map(|&c| c as f32 / total).collect(),
    }
}

/// Reorder `rows` so entries matching `goes_left` come first; returns their count.
fn partition(rows: &mut [usize], goes_left: impl Fn(usize) -> bool) -> usize {
    let mut boundary = 0usize;
    for i in 0..rows.len() {
        if goes_left(rows[i]) {
            rows.swap(i, boundary);
            boundary += 1;
        }
    }
    boundary
}
