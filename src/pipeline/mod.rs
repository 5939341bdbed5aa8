//! Immutable inference pipeline built from a loaded artifact bundle.
//!
//! Raw features go through the min-max scaler, then the standard scaler,
//! then the forest; the output is decoded into a crop name.

mod decode;

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::artifacts::{Artifact, ArtifactKind, LoadedArtifacts, RunStamp, Stored};
use crate::ml::forest::ForestError;
use crate::ml::scaler::ScalerError;
use crate::ml::{LabelEncoder, MinMaxScaler, Prediction, RandomForest, StandardScaler, Transform};
use crate::schema::{FEATURE_COUNT, FeatureVector};

pub use decode::{DecodeSource, Decoded, FALLBACK_CROPS, capitalize, decode, fallback_crop};

/// Why a bundle cannot back an inference pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    #[error("missing artifacts: {}", list_kinds(.0))]
    MissingArtifact(Vec<ArtifactKind>),
    #[error("{kind} comes from run {found}, expected run {expected}")]
    RunMismatch {
        kind: ArtifactKind,
        expected: Uuid,
        found: Uuid,
    },
    #[error("{kind} expects {found} features, expected {expected}")]
    FeatureCountMismatch {
        kind: ArtifactKind,
        expected: usize,
        found: usize,
    },
}

fn list_kinds(kinds: &[ArtifactKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A single request failed; the pipeline stays usable.
#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("feature scaling failed: {0}")]
    Scale(#[from] ScalerError),
    #[error("classification failed: {0}")]
    Classify(#[from] ForestError),
}

/// Raw classifier output together with its decoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub prediction: Prediction,
    pub decoded: Decoded,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.decoded.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct InferencePipeline {
    stamp: RunStamp,
    minmax: MinMaxScaler,
    standard: StandardScaler,
    model: RandomForest,
    encoder: Option<LabelEncoder>,
}

impl InferencePipeline {
    /// Assemble a pipeline from a loaded bundle.
    ///
    /// The forest and both scalers are required and must share one run id and
    /// the schema's feature count. An encoder that failed to load is skipped;
    /// one from a different run rejects the bundle.
    pub fn from_artifacts(loaded: LoadedArtifacts) -> Result<Self, PipelineError> {
        let missing = loaded.missing_required();
        let (Ok(model), Ok(minmax), Ok(standard)) = (loaded.model, loaded.minmax, loaded.standard)
        else {
            return Err(PipelineError::MissingArtifact(missing));
        };

        let stamp = model.stamp.clone();
        check_run(&stamp, &minmax)?;
        check_run(&stamp, &standard)?;
        check_width(&model)?;
        check_width(&minmax)?;
        check_width(&standard)?;

        let encoder = match loaded.encoder {
            Ok(encoder) => {
                check_run(&stamp, &encoder)?;
                Some(encoder.value)
            }
            Err(_) => None,
        };

        tracing::info!(
            run_id = %stamp.run_id,
            trained_at = %stamp.trained_at,
            encoder = encoder.is_some(),
            "Inference pipeline ready"
        );
        Ok(Self {
            stamp,
            minmax: minmax.value,
            standard: standard.value,
            model: model.value,
            encoder,
        })
    }

    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    pub fn has_encoder(&self) -> bool {
        self.encoder.is_some()
    }

    /// Raw classifier output for one feature vector.
    pub fn classify(&self, features: &FeatureVector) -> Result<Prediction, PredictionError> {
        let scaled = self.minmax.transform_row(features.as_slice())?;
        let standardized = self.standard.transform_row(&scaled)?;
        Ok(self.model.predict(&standardized)?)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Recommendation, PredictionError> {
        let prediction = self.classify(features)?;
        let decoded = decode(&prediction, self.encoder.as_ref());
        if decoded.is_unknown() {
            tracing::warn!("No crop name for prediction {prediction}");
        }
        Ok(Recommendation {
            prediction,
            decoded,
        })
    }
}

fn check_run<T: Artifact>(expected: &RunStamp, stored: &Stored<T>) -> Result<(), PipelineError> {
    if stored.stamp.run_id == expected.run_id {
        Ok(())
    } else {
        Err(PipelineError::RunMismatch {
            kind: T::KIND,
            expected: expected.run_id,
            found: stored.stamp.run_id,
        })
    }
}

fn check_width<T: Artifact>(stored: &Stored<T>) -> Result<(), PipelineError> {
    match stored.value.n_features() {
        Some(found) if found != FEATURE_COUNT => Err(PipelineError::FeatureCountMismatch {
            kind: T::KIND,
            expected: FEATURE_COUNT,
            found,
        }),
        _ => Ok(()),
    }
}
