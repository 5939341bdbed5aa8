//! Shared feature schema for the training and serving flows.
//!
//! Scalers and the classifier are fit on this exact column order, so every
//! producer of feature vectors (CSV loader, form UI, CLI) goes through
//! [`FEATURE_COLUMNS`] instead of hard-coding its own ordering.

use serde::{Deserialize, Serialize};

/// Number of measurements in a feature vector.
pub const FEATURE_COUNT: usize = 7;

/// Name of the dataset column holding the crop label.
pub const LABEL_COLUMN: &str = "label";

/// Metadata for one feature column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureColumn {
    /// Header name in the dataset CSV.
    pub name: &'static str,
    /// Human-readable label for input forms.
    pub display: &'static str,
    /// Increment used by numeric input widgets.
    pub step: f64,
}

/// Feature columns in model order.
pub const FEATURE_COLUMNS: [FeatureColumn; FEATURE_COUNT] = [
    FeatureColumn {
        name: "N",
        display: "Nitrogen",
        step: 0.01,
    },
    FeatureColumn {
        name: "P",
        display: "Phosphorus",
        step: 0.01,
    },
    FeatureColumn {
        name: "K",
        display: "Potassium",
        step: 0.01,
    },
    FeatureColumn {
        name: "temperature",
        display: "Temperature (°C)",
        step: 0.01,
    },
    FeatureColumn {
        name: "humidity",
        display: "Humidity (%)",
        step: 0.01,
    },
    FeatureColumn {
        name: "ph",
        display: "pH",
        step: 0.01,
    },
    FeatureColumn {
        name: "rainfall",
        display: "Rainfall (mm)",
        step: 0.01,
    },
];

/// Ordered soil/climate measurements `(N, P, K, temperature, humidity, ph, rainfall)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Build a vector from values already in schema order.
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Build a vector from a slice, returning `None` unless it has exactly
    /// [`FEATURE_COUNT`] values.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let values: [f64; FEATURE_COUNT] = values.try_into().ok()?;
        Some(Self(values))
    }

    /// Borrow the values in schema order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Position of a column name in the schema.
pub fn column_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|column| column.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_order_is_fixed() {
        let names: Vec<&str> = FEATURE_COLUMNS.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"]
        );
        assert_eq!(column_index("humidity"), Some(4));
        assert_eq!(column_index("label"), None);
    }

    #[test]
    fn from_slice_requires_exact_length() {
        assert!(FeatureVector::from_slice(&[1.0; 6]).is_none());
        assert!(FeatureVector::from_slice(&[1.0; 8]).is_none());
        let vector = FeatureVector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
        assert_eq!(vector.as_slice()[6], 7.0);
    }
}
