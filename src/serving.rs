//! Process-wide serving state: the bundle is loaded once and shared read-only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::artifacts::{ArtifactStatus, RunStamp, load_bundle};
use crate::pipeline::{InferencePipeline, PipelineError, PredictionError, Recommendation};
use crate::schema::FeatureVector;

#[derive(Debug, Error, PartialEq)]
pub enum ServeError {
    /// The bundle cannot back a pipeline; the reason names the cause.
    #[error("recommendations unavailable: {0}")]
    Unavailable(PipelineError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

#[derive(Debug)]
pub struct ServingContext {
    artifact_dir: PathBuf,
    statuses: Vec<ArtifactStatus>,
    warnings: Vec<String>,
    pipeline: Result<InferencePipeline, PipelineError>,
}

impl ServingContext {
    /// Load the bundle in `artifact_dir` and build the pipeline if possible.
    pub fn load(artifact_dir: &Path) -> Arc<Self> {
        let loaded = load_bundle(artifact_dir);
        let statuses = loaded.statuses();
        let warnings = loaded.warnings();
        let pipeline = InferencePipeline::from_artifacts(loaded);
        if let Err(err) = &pipeline {
            tracing::warn!("Recommendations unavailable: {err}");
        }
        Arc::new(Self {
            artifact_dir: artifact_dir.to_path_buf(),
            statuses,
            warnings,
            pipeline,
        })
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn statuses(&self) -> &[ArtifactStatus] {
        &self.statuses
    }

    /// Present-but-unusable artifacts.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.is_ok()
    }

    /// Reason inference is blocked, if it is.
    pub fn unavailable_reason(&self) -> Option<&PipelineError> {
        self.pipeline.as_ref().err()
    }

    /// Training run behind the loaded pipeline.
    pub fn run_stamp(&self) -> Option<&RunStamp> {
        self.pipeline.as_ref().ok().map(InferencePipeline::stamp)
    }

    pub fn recommend(&self, features: &FeatureVector) -> Result<Recommendation, ServeError> {
        let pipeline = self
            .pipeline
            .as_ref()
            .map_err(|err| ServeError::Unavailable(err.clone()))?;
        let recommendation = pipeline.predict(features)?;
        tracing::info!(
            prediction = %recommendation.prediction,
            "Recommended {}",
            recommendation.decoded
        );
        Ok(recommendation)
    }
}
