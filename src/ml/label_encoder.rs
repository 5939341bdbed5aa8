//! Bidirectional mapping between crop names and integer class indices.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EncoderError {
    #[error("cannot fit a label encoder on zero labels")]
    Empty,
    #[error("label {0:?} was not seen during fit")]
    UnseenLabel(String),
    #[error("index {index} is outside 0..{classes}")]
    IndexOutOfRange { index: i64, classes: usize },
}

/// Sorted unique labels; a label's index is its position in `classes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on `labels`, collecting the sorted distinct values.
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Result<Self, EncoderError> {
        if labels.is_empty() {
            return Err(EncoderError::Empty);
        }
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Ok(Self { classes })
    }

    /// Fit and encode in one pass.
    pub fn fit_transform<S: AsRef<str>>(labels: &[S]) -> Result<(Self, Vec<i64>), EncoderError> {
        let encoder = Self::fit(labels)?;
        let encoded = labels
            .iter()
            .map(|label| encoder.transform(label.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((encoder, encoded))
    }

    pub fn transform(&self, label: &str) -> Result<i64, EncoderError> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .map(|idx| idx as i64)
            .map_err(|_| EncoderError::UnseenLabel(label.to_string()))
    }

    pub fn inverse_transform(&self, index: i64) -> Result<&str, EncoderError> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
            .ok_or(EncoderError::IndexOutOfRange {
                index,
                classes: self.classes.len(),
            })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("label encoder has no classes".to_string());
        }
        if self.classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("label encoder classes must be sorted and unique".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_sorted_and_unique() {
        let (encoder, encoded) =
            LabelEncoder::fit_transform(&["rice", "maize", "rice", "apple"]).unwrap();
        assert_eq!(encoder.classes, vec!["apple", "maize", "rice"]);
        assert_eq!(encoded, vec![2, 1, 2, 0]);
        encoder.validate().unwrap();
    }

    #[test]
    fn encode_then_decode_returns_original() {
        let labels = ["rice", "maize", "chickpea", "kidneybeans", "coffee"];
        let encoder = LabelEncoder::fit(&labels).unwrap();
        for label in labels {
            let idx = encoder.transform(label).unwrap();
            assert_eq!(encoder.inverse_transform(idx).unwrap(), label);
        }
    }

    #[test]
    fn rejects_unknown_values() {
        let encoder = LabelEncoder::fit(&["rice"]).unwrap();
        assert_eq!(
            encoder.transform("jute").unwrap_err(),
            EncoderError::UnseenLabel("jute".into())
        );
        assert!(matches!(
            encoder.inverse_transform(1),
            Err(EncoderError::IndexOutOfRange { index: 1, classes: 1 })
        ));
        assert!(encoder.inverse_transform(-1).is_err());
        assert_eq!(
            LabelEncoder::fit::<&str>(&[]).unwrap_err(),
            EncoderError::Empty
        );
    }

    #[test]
    fn validate_rejects_unsorted_classes() {
        let encoder = LabelEncoder {
            classes: vec!["rice".into(), "apple".into()],
        };
        assert!(encoder.validate().is_err());
    }
}
