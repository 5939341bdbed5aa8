//! Random-forest classifier over scaled feature vectors.
//!
//! A forest of CART trees grown on bootstrap samples with gini impurity and
//! `sqrt(n_features)` candidate features per split. Leaves keep class
//! distributions; the forest averages them and predicts the argmax.
//! Everything is seeded, so the same data and options give the same model,
//! and the model round-trips through JSON.

mod model;
mod train;

pub use model::{
    ClassSet, DecisionTree, FOREST_MODEL_VERSION, ForestError, Prediction, RandomForest, TreeNode,
};
pub use train::{TrainOptions, encode_targets, train_forest};
