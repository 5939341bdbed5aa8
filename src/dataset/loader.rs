//! CSV dataset loader for `N,P,K,temperature,humidity,ph,rainfall,label` files.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::schema::{FEATURE_COLUMNS, FEATURE_COUNT, FeatureVector, LABEL_COLUMN};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset is missing column `{0}`")]
    MissingColumn(&'static str),
    #[error("line {line}: column `{column}` has invalid value {value:?}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("line {line}: empty label")]
    EmptyLabel { line: u64 },
    #[error("dataset has no rows")]
    Empty,
}

/// Label column contents, typed once for the whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    /// Non-numeric crop names.
    Text(Vec<String>),
    /// Every label is an integral number, such as `3` or `3.0`.
    Numeric(Vec<i64>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Text(values) => values.len(),
            Labels::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct label values rendered as strings, in sorted order.
    pub fn distinct(&self) -> Vec<String> {
        match self {
            Labels::Text(values) => values
                .iter()
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Labels::Numeric(values) => values
                .iter()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

/// Feature rows in schema order with their labels.
#[derive(Debug, Clone)]
pub struct CropDataset {
    pub features: Vec<FeatureVector>,
    pub labels: Labels,
}

impl CropDataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Load a dataset CSV from disk.
pub fn load_csv(path: &Path) -> Result<CropDataset, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = read_csv(file)?;
    tracing::info!(
        rows = dataset.len(),
        classes = dataset.labels.distinct().len(),
        "Loaded dataset {}",
        path.display()
    );
    Ok(dataset)
}

/// Parse a dataset from any CSV reader.
///
/// Columns are located by header name, so extra columns and a different
/// column order in the file are accepted.
pub fn read_csv<R: Read>(reader: R) -> Result<CropDataset, DatasetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let feature_idx = locate_feature_columns(&headers)?;
    let label_idx = header_position(&headers, LABEL_COLUMN)
        .ok_or(DatasetError::MissingColumn(LABEL_COLUMN))?;

    let mut features = Vec::new();
    let mut raw_labels = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let mut values = [0.0f64; FEATURE_COUNT];
        for (slot, (&idx, column)) in values
            .iter_mut()
            .zip(feature_idx.iter().zip(FEATURE_COLUMNS.iter()))
        {
            let raw = record.get(idx).unwrap_or("");
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DatasetError::InvalidValue {
                    line,
                    column: column.name,
                    value: raw.to_string(),
                })?;
        }
        let label = record.get(label_idx).unwrap_or("");
        if label.is_empty() {
            return Err(DatasetError::EmptyLabel { line });
        }
        features.push(FeatureVector::new(values));
        raw_labels.push(label.to_string());
    }

    if features.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(CropDataset {
        features,
        labels: type_labels(raw_labels),
    })
}

fn locate_feature_columns(
    headers: &StringRecord,
) -> Result<[usize; FEATURE_COUNT], DatasetError> {
    let mut out = [0usize; FEATURE_COUNT];
    for (slot, column) in out.iter_mut().zip(FEATURE_COLUMNS.iter()) {
        *slot = header_position(headers, column.name)
            .ok_or(DatasetError::MissingColumn(column.name))?;
    }
    Ok(out)
}

fn header_position(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

fn type_labels(raw: Vec<String>) -> Labels {
    let parsed: Option<Vec<i64>> = raw.iter().map(|label| integral_label(label)).collect();
    match parsed {
        Some(values) => Labels::Numeric(values),
        None => Labels::Text(raw),
    }
}

fn integral_label(label: &str) -> Option<i64> {
    if let Ok(value) = label.parse::<i64>() {
        return Some(value);
    }
    let value = label.parse::<f64>().ok()?;
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}
