//! Input form state, kept apart from egui so it can be tested headless.

use crate::pipeline::{PipelineError, Recommendation};
use crate::schema::{FEATURE_COUNT, FeatureVector};
use crate::serving::{ServeError, ServingContext};

/// Result of the last submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Recommended(Recommendation),
    /// Inference was blocked or failed; the message is shown as an error.
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub values: [f64; FEATURE_COUNT],
    pub outcome: Option<Outcome>,
}

impl FormState {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(self.values)
    }

    /// Run one recommendation with the current values.
    pub fn submit(&mut self, serving: &ServingContext) {
        let outcome = match serving.recommend(&self.features()) {
            Ok(recommendation) => Outcome::Recommended(recommendation),
            Err(ServeError::Unavailable(reason)) => Outcome::Failed(unavailable_message(&reason)),
            Err(err) => Outcome::Failed(format!("Prediction error: {err}")),
        };
        self.outcome = Some(outcome);
    }

    /// Text for the result line, if there is one.
    pub fn result_line(&self) -> Option<String> {
        match self.outcome.as_ref()? {
            Outcome::Recommended(rec) => Some(format!("Recommended Crop: {}", rec.decoded)),
            Outcome::Failed(message) => Some(message.clone()),
        }
    }

    pub fn has_recommendation(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Recommended(_)))
    }
}

/// User-facing text for a bundle that cannot back recommendations.
pub fn unavailable_message(reason: &PipelineError) -> String {
    match reason {
        PipelineError::MissingArtifact(_) => {
            format!("Model or scaler not loaded ({reason}). Fix files and restart.")
        }
        PipelineError::RunMismatch { .. } | PipelineError::FeatureCountMismatch { .. } => {
            format!("Artifact files do not belong together: {reason}. Retrain and restart.")
        }
    }
}
