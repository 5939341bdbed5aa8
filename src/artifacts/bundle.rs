use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{
    Artifact, ArtifactKind, LoadError, RunStamp, SaveError, Stored, load_artifact, save_artifact,
};
use crate::ml::{LabelEncoder, MinMaxScaler, RandomForest, StandardScaler};

/// Everything one training run persists.
#[derive(Debug, Clone)]
pub struct TrainedArtifacts {
    pub stamp: RunStamp,
    pub model: RandomForest,
    pub minmax: MinMaxScaler,
    pub standard: StandardScaler,
    /// Present only when text labels were encoded to indices.
    pub encoder: Option<LabelEncoder>,
}

/// Write a full bundle into `dir`.
///
/// A `label_encoder.json` left over from an earlier run is removed when this
/// run has no encoder, so the directory never mixes runs.
pub fn save_bundle(dir: &Path, artifacts: &TrainedArtifacts) -> Result<Vec<PathBuf>, SaveError> {
    let stamp = &artifacts.stamp;
    let mut written = vec![
        save_artifact(dir, stamp, &artifacts.minmax)?,
        save_artifact(dir, stamp, &artifacts.standard)?,
    ];
    match &artifacts.encoder {
        Some(encoder) => written.push(save_artifact(dir, stamp, encoder)?),
        None => {
            let stale = ArtifactKind::LabelEncoder.path_in(dir);
            match std::fs::remove_file(&stale) {
                Ok(()) => info!("Removed stale {}", stale.display()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(SaveError::RemoveStale { path: stale, source }),
            }
        }
    }
    written.push(save_artifact(dir, stamp, &artifacts.model)?);
    info!(
        run_id = %stamp.run_id,
        files = written.len(),
        "Saved artifact bundle to {}",
        dir.display()
    );
    Ok(written)
}

/// Per-slot load outcomes for one artifact directory.
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub dir: PathBuf,
    pub model: Result<Stored<RandomForest>, LoadError>,
    pub minmax: Result<Stored<MinMaxScaler>, LoadError>,
    pub standard: Result<Stored<StandardScaler>, LoadError>,
    pub encoder: Result<Stored<LabelEncoder>, LoadError>,
}

/// Presence of one artifact, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactState {
    Loaded,
    Missing,
    /// Present but unusable.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStatus {
    pub kind: ArtifactKind,
    pub state: ArtifactState,
}

impl ArtifactStatus {
    pub fn is_usable(&self) -> bool {
        self.state == ArtifactState::Loaded
    }
}

fn state_of<T>(result: &Result<Stored<T>, LoadError>) -> ArtifactState {
    match result {
        Ok(_) => ArtifactState::Loaded,
        Err(err) if err.is_missing() => ArtifactState::Missing,
        Err(err) => ArtifactState::Failed(err.to_string()),
    }
}

impl LoadedArtifacts {
    /// Status of each slot in `ArtifactKind::ALL` order.
    pub fn statuses(&self) -> Vec<ArtifactStatus> {
        ArtifactKind::ALL
            .into_iter()
            .map(|kind| ArtifactStatus {
                kind,
                state: self.state(kind),
            })
            .collect()
    }

    pub fn state(&self, kind: ArtifactKind) -> ArtifactState {
        match kind {
            ArtifactKind::Model => state_of(&self.model),
            ArtifactKind::MinMaxScaler => state_of(&self.minmax),
            ArtifactKind::StandardScaler => state_of(&self.standard),
            ArtifactKind::LabelEncoder => state_of(&self.encoder),
        }
    }

    /// Messages for artifacts that exist but could not be used.
    pub fn warnings(&self) -> Vec<String> {
        self.statuses()
            .into_iter()
            .filter_map(|status| match status.state {
                ArtifactState::Failed(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    /// Required kinds that did not load.
    pub fn missing_required(&self) -> Vec<ArtifactKind> {
        self.statuses()
            .into_iter()
            .filter(|status| status.kind.is_required() && !status.is_usable())
            .map(|status| status.kind)
            .collect()
    }
}

fn load_logged<T: Artifact>(dir: &Path) -> Result<Stored<T>, LoadError> {
    let result = load_artifact::<T>(dir);
    if let Err(err) = &result {
        if !err.is_missing() {
            warn!(artifact = %T::KIND, "Failed to load artifact: {err}");
        }
    }
    result
}

/// Load every slot from `dir` independently.
pub fn load_bundle(dir: &Path) -> LoadedArtifacts {
    let loaded = LoadedArtifacts {
        dir: dir.to_path_buf(),
        model: load_logged(dir),
        minmax: load_logged(dir),
        standard: load_logged(dir),
        encoder: load_logged(dir),
    };
    let present = loaded
        .statuses()
        .iter()
        .filter(|status| status.is_usable())
        .count();
    info!(
        "Loaded {present}/{} artifacts from {}",
        ArtifactKind::ALL.len(),
        dir.display()
    );
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::{ClassSet, TrainOptions, train_forest};
    use ndarray::array;
    use tempfile::tempdir;

    fn tiny_bundle(encoder: Option<LabelEncoder>) -> TrainedArtifacts {
        let x = array![[0.0, 1.0], [1.0, 0.0], [0.0, 0.9], [1.0, 0.1]];
        let minmax = MinMaxScaler::fit(x.view()).unwrap();
        let standard = StandardScaler::fit(x.view()).unwrap();
        let options = TrainOptions {
            n_estimators: 3,
            ..TrainOptions::default()
        };
        let model = train_forest(x.view(), &[0, 1, 0, 1], ClassSet::Indices(vec![0, 1]), &options)
            .unwrap();
        TrainedArtifacts {
            stamp: RunStamp::new(),
            model,
            minmax,
            standard,
            encoder,
        }
    }

    #[test]
    fn saved_bundle_loads_every_slot() {
        let dir = tempdir().unwrap();
        let bundle = tiny_bundle(Some(LabelEncoder::fit(&["a", "b"]).unwrap()));
        let written = save_bundle(dir.path(), &bundle).unwrap();
        assert_eq!(written.len(), 4);

        let loaded = load_bundle(dir.path());
        assert!(loaded.statuses().iter().all(ArtifactStatus::is_usable));
        assert!(loaded.missing_required().is_empty());
        assert_eq!(loaded.model.unwrap().stamp, bundle.stamp);
    }

    #[test]
    fn bundle_without_encoder_removes_stale_file() {
        let dir = tempdir().unwrap();
        save_bundle(
            dir.path(),
            &tiny_bundle(Some(LabelEncoder::fit(&["a"]).unwrap())),
        )
        .unwrap();
        save_bundle(dir.path(), &tiny_bundle(None)).unwrap();

        assert!(!dir.path().join("label_encoder.json").exists());
        let loaded = load_bundle(dir.path());
        assert_eq!(loaded.state(ArtifactKind::LabelEncoder), ArtifactState::Missing);
        assert!(loaded.warnings().is_empty());
    }

    #[test]
    fn missing_and_failed_slots_are_distinguished() {
        let dir = tempdir().unwrap();
        save_bundle(dir.path(), &tiny_bundle(None)).unwrap();
        std::fs::remove_file(dir.path().join("model.json")).unwrap();
        std::fs::write(dir.path().join("standscaler.json"), "{\"format_version\":").unwrap();

        let loaded = load_bundle(dir.path());
        assert_eq!(loaded.state(ArtifactKind::Model), ArtifactState::Missing);
        assert!(matches!(
            loaded.state(ArtifactKind::StandardScaler),
            ArtifactState::Failed(_)
        ));
        assert_eq!(loaded.warnings().len(), 1);
        assert_eq!(
            loaded.missing_required(),
            vec![ArtifactKind::Model, ArtifactKind::StandardScaler]
        );
    }
}
