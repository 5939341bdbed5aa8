//! Min-max and standardization scalers fit on feature matrices.
//!
//! Both scalers follow the usual conventions: the min-max scaler maps the
//! training range of each feature onto `feature_range`, the standard scaler
//! subtracts the mean and divides by the population standard deviation.
//! Zero-width ranges and zero variance use a scale of `1` so constant
//! features pass through shifted instead of producing NaN.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScalerError {
    #[error("cannot fit a scaler on zero rows")]
    EmptyInput,
    #[error("feature {feature} contains a non-finite value")]
    NonFiniteInput { feature: usize },
    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("scaler parameters are inconsistent: {0}")]
    InvalidParameters(String),
}

/// Row-wise transform applied between raw features and the classifier.
pub trait Transform {
    /// Number of features the transform was fit on.
    fn n_features(&self) -> usize;

    /// Transform a single row.
    fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError>;

    /// Transform every row of `x` into a new matrix.
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScalerError> {
        check_width(self.n_features(), x.ncols())?;
        let mut out = Array2::zeros(x.raw_dim());
        for (mut target, source) in out.rows_mut().into_iter().zip(x.rows()) {
            let row: Vec<f64> = source.iter().copied().collect();
            for (slot, value) in target.iter_mut().zip(self.transform_row(&row)?) {
                *slot = value;
            }
        }
        Ok(out)
    }
}

/// Scales each feature linearly into `feature_range` using the training min/max.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub feature_range: (f64, f64),
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit on `x` with the default `[0, 1]` output range.
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, ScalerError> {
        Self::fit_with_range(x, (0.0, 1.0))
    }

    pub fn fit_with_range(
        x: ArrayView2<'_, f64>,
        feature_range: (f64, f64),
    ) -> Result<Self, ScalerError> {
        check_fit_input(x)?;
        if !(feature_range.0 < feature_range.1) {
            return Err(ScalerError::InvalidParameters(format!(
                "feature_range {feature_range:?} must be increasing"
            )));
        }
        let data_min = x
            .fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v))
            .to_vec();
        let data_max = x
            .fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v))
            .to_vec();
        Ok(Self {
            feature_range,
            data_min,
            data_max,
        })
    }

    /// Per-feature multiplier applied after subtracting `data_min`.
    pub fn scale(&self, feature: usize) -> f64 {
        let (lo, hi) = self.feature_range;
        let range = self.data_max[feature] - self.data_min[feature];
        let range = if range == 0.0 { 1.0 } else { range };
        (hi - lo) / range
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.data_min.is_empty() {
            return Err("data_min is empty".to_string());
        }
        if self.data_min.len() != self.data_max.len() {
            return Err("data_min/data_max length mismatch".to_string());
        }
        let (lo, hi) = self.feature_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(format!("invalid feature_range ({lo}, {hi})"));
        }
        for (j, (&min, &max)) in self.data_min.iter().zip(&self.data_max).enumerate() {
            if !min.is_finite() || !max.is_finite() || min > max {
                return Err(format!("invalid range for feature {j}: [{min}, {max}]"));
            }
        }
        Ok(())
    }
}

impl Transform for MinMaxScaler {
    fn n_features(&self) -> usize {
        self.data_min.len()
    }

    fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError> {
        check_row(self.n_features(), row)?;
        let lo = self.feature_range.0;
        Ok(row
            .iter()
            .enumerate()
            .map(|(j, &v)| (v - self.data_min[j]) * self.scale(j) + lo)
            .collect())
    }
}

/// Centers each feature on its training mean and divides by its standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    /// Population standard deviation, with zero replaced by `1`.
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, ScalerError> {
        check_fit_input(x)?;
        let n = x.nrows() as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let mut scale = Vec::with_capacity(x.ncols());
        for (j, column) in x.columns().into_iter().enumerate() {
            let m = mean[j];
            let var = column.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / n;
            let std = var.sqrt();
            scale.push(if std == 0.0 { 1.0 } else { std });
        }
        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.mean.is_empty() {
            return Err("mean is empty".to_string());
        }
        if self.mean.len() != self.scale.len() {
            return Err("mean/scale length mismatch".to_string());
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err("mean contains a non-finite value".to_string());
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err("scale must be finite and > 0".to_string());
        }
        Ok(())
    }
}

impl Transform for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError> {
        check_row(self.n_features(), row)?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(j, &v)| (v - self.mean[j]) / self.scale[j])
            .collect())
    }
}

fn check_fit_input(x: ArrayView2<'_, f64>) -> Result<(), ScalerError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ScalerError::EmptyInput);
    }
    for (feature, column) in x.columns().into_iter().enumerate() {
        if column.iter().any(|v| !v.is_finite()) {
            return Err(ScalerError::NonFiniteInput { feature });
        }
    }
    Ok(())
}

fn check_width(expected: usize, actual: usize) -> Result<(), ScalerError> {
    if expected != actual {
        return Err(ScalerError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn check_row(expected: usize, row: &[f64]) -> Result<(), ScalerError> {
    check_width(expected, row.len())?;
    if let Some(feature) = row.iter().position(|v| !v.is_finite()) {
        return Err(ScalerError::NonFiniteInput { feature });
    }
    Ok(())
}
