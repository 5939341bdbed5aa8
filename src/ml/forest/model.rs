use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current forest serialization version.
pub const FOREST_MODEL_VERSION: i64 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum ForestError {
    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("feature {feature} is not a finite number")]
    NonFiniteInput { feature: usize },
    #[error("cannot train on an empty dataset")]
    EmptyDataset,
    #[error("{rows} feature rows but {targets} targets")]
    MismatchedLengths { rows: usize, targets: usize },
    #[error("target {target} is outside 0..{classes}")]
    TargetOutOfRange { target: usize, classes: usize },
    #[error("invalid training options: {0}")]
    InvalidOptions(String),
    #[error("corrupt tree {tree}: {reason}")]
    CorruptTree { tree: usize, reason: String },
}

/// Class values the forest was fit on, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ClassSet {
    /// Integer classes (encoded indices or numeric dataset labels).
    Indices(Vec<i64>),
    /// Raw string labels, used when label encoding is disabled.
    Labels(Vec<String>),
}

impl ClassSet {
    pub fn len(&self) -> usize {
        match self {
            ClassSet::Indices(values) => values.len(),
            ClassSet::Labels(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prediction for the class at output position `position`.
    pub fn prediction(&self, position: usize) -> Option<Prediction> {
        match self {
            ClassSet::Indices(values) => values.get(position).copied().map(Prediction::Index),
            ClassSet::Labels(values) => values.get(position).cloned().map(Prediction::Label),
        }
    }

    /// Display name for an output position, used in evaluation reports.
    pub fn name(&self, position: usize) -> String {
        self.prediction(position)
            .map(|p| p.to_string())
            .unwrap_or_default()
    }
}

/// Value emitted by the classifier for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    /// Integer class: an encoder index or a numeric dataset label.
    Index(i64),
    /// String class label.
    Label(String),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Index(idx) => write!(f, "{idx}"),
            Prediction::Label(label) => f.write_str(label),
        }
    }
}

/// Node of a decision tree stored in pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Rows with `feature <= threshold` go to `left`, all others to `right`.
    Split {
        feature: u16,
        threshold: f64,
        left: u32,
        right: u32,
    },
    /// Class proportions of the training rows that reached this leaf.
    Leaf { distribution: Vec<f32> },
}

/// Single CART tree; node `0` is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Leaf distribution reached by `row`.
    ///
    /// `row` must already be checked for length; `validate` guarantees every
    /// child index points forward, so the walk terminates.
    pub fn leaf_distribution(&self, row: &[f64]) -> &[f32] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature as usize] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature as usize >= n_features {
                        return Err(format!("node {idx} splits on unknown feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [*left as usize, *right as usize] {
                        if child <= idx || child >= len {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!(
                            "leaf {idx} has {} classes but expected {n_classes}",
                            distribution.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Random forest classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Model format version.
    pub model_version: i64,
    /// Number of features per input row.
    pub n_features: usize,
    /// Classes in output order.
    pub classes: ClassSet,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Validate structural invariants of a loaded model.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != FOREST_MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {FOREST_MODEL_VERSION})",
                self.model_version
            ));
        }
        if self.n_features == 0 {
            return Err("n_features must be > 0".to_string());
        }
        if self.classes.is_empty() {
            return Err("Model must contain at least 1 class".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model has no trees".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|reason| format!("tree {tree_idx}: {reason}"))?;
        }
        Ok(())
    }

    /// Average class probabilities across trees.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ForestError> {
        self.check_row(row)?;
        let mut proba = vec![0.0f64; self.classes.len()];
        for tree in &self.trees {
            for (acc, &p) in proba.iter_mut().zip(tree.leaf_distribution(row)) {
                *acc += p as f64;
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        for p in &mut proba {
            *p /= n_trees;
        }
        Ok(proba)
    }

    /// Output position of the most probable class (lowest position on ties).
    pub fn predict_position(&self, row: &[f64]) -> Result<usize, ForestError> {
        Ok(argmax(&self.predict_proba(row)?))
    }

    /// Predicted class value for `row`.
    pub fn predict(&self, row: &[f64]) -> Result<Prediction, ForestError> {
        let position = self.predict_position(row)?;
        self.classes
            .prediction(position)
            .ok_or_else(|| ForestError::CorruptTree {
                tree: 0,
                reason: format!("class position {position} has no class value"),
            })
    }

    fn check_row(&self, row: &[f64]) -> Result<(), ForestError> {
        if row.len() != self.n_features {
            return Err(ForestError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        if let Some(feature) = row.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteInput { feature });
        }
        Ok(())
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f64::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}
