//! Turning a raw classifier output into a crop name.

use std::fmt;

use crate::ml::{LabelEncoder, Prediction};

/// Crop names for the numeric labels of the reference dataset.
pub const FALLBACK_CROPS: [(i64, &str); 22] = [
    (1, "Rice"),
    (2, "Maize"),
    (3, "Jute"),
    (4, "Cotton"),
    (5, "Coconut"),
    (6, "Papaya"),
    (7, "Orange"),
    (8, "Apple"),
    (9, "Muskmelon"),
    (10, "Watermelon"),
    (11, "Grapes"),
    (12, "Mango"),
    (13, "Banana"),
    (14, "Pomegranate"),
    (15, "Lentil"),
    (16, "Blackgram"),
    (17, "Mungbean"),
    (18, "Mothbeans"),
    (19, "Pigeonpeas"),
    (20, "Kidneybeans"),
    (21, "Chickpea"),
    (22, "Coffee"),
];

pub fn fallback_crop(index: i64) -> Option<&'static str> {
    FALLBACK_CROPS
        .iter()
        .find(|(key, _)| *key == index)
        .map(|(_, name)| *name)
}

/// Where a decoded name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeSource {
    Encoder,
    Label,
    Table,
}

/// Final outcome shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Crop { name: String, source: DecodeSource },
    /// No decode rule matched; the raw prediction is kept for logging.
    Unknown { prediction: Prediction },
}

impl Decoded {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Decoded::Unknown { .. })
    }
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::Crop { name, .. } => f.write_str(name),
            Decoded::Unknown { .. } => f.write_str("unknown"),
        }
    }
}

/// Decode in priority order: encoder, string label, fallback table.
pub fn decode(prediction: &Prediction, encoder: Option<&LabelEncoder>) -> Decoded {
    if let (Some(encoder), Prediction::Index(index)) = (encoder, prediction) {
        match encoder.inverse_transform(*index) {
            Ok(name) => {
                return Decoded::Crop {
                    name: capitalize(name),
                    source: DecodeSource::Encoder,
                };
            }
            Err(err) => tracing::debug!("Encoder could not decode {index}: {err}"),
        }
    }
    match prediction {
        Prediction::Label(label) => Decoded::Crop {
            name: capitalize(label),
            source: DecodeSource::Label,
        },
        Prediction::Index(index) => match fallback_crop(*index) {
            Some(name) => Decoded::Crop {
                name: name.to_string(),
                source: DecodeSource::Table,
            },
            None => Decoded::Unknown {
                prediction: prediction.clone(),
            },
        },
    }
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
