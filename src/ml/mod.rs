//! Preprocessing transforms, the classifier and evaluation metrics.
//!
//! These are the fitted building blocks persisted in the artifact bundle.

pub mod forest;
pub mod label_encoder;
pub mod metrics;
pub mod scaler;

use ndarray::Array2;

use crate::schema::{FEATURE_COUNT, FeatureVector};

pub use forest::{ClassSet, Prediction, RandomForest};
pub use label_encoder::LabelEncoder;
pub use scaler::{MinMaxScaler, StandardScaler, Transform};

/// Stack feature vectors into an `n x 7` matrix in schema order.
pub fn feature_matrix(rows: &[FeatureVector]) -> Array2<f64> {
    let mut x = Array2::zeros((rows.len(), FEATURE_COUNT));
    for (mut target, row) in x.rows_mut().into_iter().zip(rows) {
        for (slot, &value) in target.iter_mut().zip(row.as_slice()) {
            *slot = value;
        }
    }
    x
}
