//! Persisted artifacts: the classifier, both scalers and the optional label encoder.
//!
//! Each artifact is one pretty-printed JSON file with a small envelope:
//!
//! ```json
//! { "format_version": 1, "kind": "model", "run_id": "…", "trained_at": "…", "payload": { … } }
//! ```
//!
//! `run_id` ties the files of one training run together so the serving side
//! can refuse a bundle assembled from different runs.

mod bundle;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::ml::{LabelEncoder, MinMaxScaler, RandomForest, StandardScaler, Transform};

pub use bundle::{
    ArtifactState, ArtifactStatus, LoadedArtifacts, TrainedArtifacts, load_bundle, save_bundle,
};

/// Envelope format version written by this build.
pub const ARTIFACT_FORMAT_VERSION: i64 = 1;

/// The four artifact slots of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Model,
    MinMaxScaler,
    StandardScaler,
    LabelEncoder,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Model,
        ArtifactKind::StandardScaler,
        ArtifactKind::MinMaxScaler,
        ArtifactKind::LabelEncoder,
    ];

    /// Fixed file name inside the artifact directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Model => "model.json",
            ArtifactKind::MinMaxScaler => "minmaxscaler.json",
            ArtifactKind::StandardScaler => "standscaler.json",
            ArtifactKind::LabelEncoder => "label_encoder.json",
        }
    }

    /// Whether inference is blocked without this artifact.
    pub fn is_required(self) -> bool {
        !matches!(self, ArtifactKind::LabelEncoder)
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A type persisted in one artifact slot.
pub trait Artifact: Serialize + DeserializeOwned {
    const KIND: ArtifactKind;

    /// Structural checks run after deserialization.
    fn validate(&self) -> Result<(), String>;

    /// Input width, for artifacts that transform or consume feature rows.
    fn n_features(&self) -> Option<usize> {
        None
    }
}

impl Artifact for RandomForest {
    const KIND: ArtifactKind = ArtifactKind::Model;

    fn validate(&self) -> Result<(), String> {
        RandomForest::validate(self)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }
}

impl Artifact for MinMaxScaler {
    const KIND: ArtifactKind = ArtifactKind::MinMaxScaler;

    fn validate(&self) -> Result<(), String> {
        MinMaxScaler::validate(self)
    }

    fn n_features(&self) -> Option<usize> {
        Some(Transform::n_features(self))
    }
}

impl Artifact for StandardScaler {
    const KIND: ArtifactKind = ArtifactKind::StandardScaler;

    fn validate(&self) -> Result<(), String> {
        StandardScaler::validate(self)
    }

    fn n_features(&self) -> Option<usize> {
        Some(Transform::n_features(self))
    }
}

impl Artifact for LabelEncoder {
    const KIND: ArtifactKind = ArtifactKind::LabelEncoder;

    fn validate(&self) -> Result<(), String> {
        LabelEncoder::validate(self)
    }
}

/// Provenance shared by every artifact of one training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStamp {
    pub run_id: Uuid,
    /// RFC 3339 UTC timestamp.
    pub trained_at: String,
}

impl RunStamp {
    /// Fresh stamp for a new training run.
    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            run_id: Uuid::new_v4(),
            trained_at: now.format(&Rfc3339).unwrap_or_else(|_| now.to_string()),
        }
    }
}

impl Default for RunStamp {
    fn default() -> Self {
        Self::new()
    }
}

/// A loaded artifact with the stamp of the run that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub stamp: RunStamp,
    pub value: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format_version: i64,
    kind: ArtifactKind,
    #[serde(flatten)]
    stamp: RunStamp,
    payload: T,
}

#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    format_version: i64,
    kind: ArtifactKind,
}

/// Why a single artifact could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file does not exist. Not a warning on its own.
    #[error("{path} is missing")]
    Missing { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Deserialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{path} holds a {found:?} artifact, expected {expected:?}")]
    WrongKind {
        path: PathBuf,
        expected: ArtifactKind,
        found: ArtifactKind,
    },
    #[error("{path} has unsupported format_version {version} (expected {ARTIFACT_FORMAT_VERSION})")]
    UnsupportedVersion { path: PathBuf, version: i64 },
    #[error("{path} is invalid: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

impl LoadError {
    pub fn is_missing(&self) -> bool {
        matches!(self, LoadError::Missing { .. })
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize {kind}: {source}")]
    Serialize {
        kind: ArtifactKind,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove stale {path}: {source}")]
    RemoveStale {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Load and validate the artifact of type `T` from `dir`.
pub fn load_artifact<T: Artifact>(dir: &Path) -> Result<Stored<T>, LoadError> {
    let path = T::KIND.path_in(dir);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::Missing { path });
        }
        Err(source) => return Err(LoadError::Read { path, source }),
    };

    let header: EnvelopeHeader =
        serde_json::from_slice(&bytes).map_err(|source| LoadError::Deserialize {
            path: path.clone(),
            source,
        })?;
    if header.kind != T::KIND {
        return Err(LoadError::WrongKind {
            path,
            expected: T::KIND,
            found: header.kind,
        });
    }
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(LoadError::UnsupportedVersion {
            path,
            version: header.format_version,
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_slice(&bytes).map_err(|source| LoadError::Deserialize {
            path: path.clone(),
            source,
        })?;
    envelope
        .payload
        .validate()
        .map_err(|reason| LoadError::Invalid {
            path: path.clone(),
            reason,
        })?;
    Ok(Stored {
        stamp: envelope.stamp,
        value: envelope.payload,
    })
}

/// Write `value` into its slot under `dir`, replacing any previous file atomically.
pub fn save_artifact<T: Artifact>(
    dir: &Path,
    stamp: &RunStamp,
    value: &T,
) -> Result<PathBuf, SaveError> {
    std::fs::create_dir_all(dir).map_err(|source| SaveError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let envelope = Envelope {
        format_version: ARTIFACT_FORMAT_VERSION,
        kind: T::KIND,
        stamp: stamp.clone(),
        payload: value,
    };
    let bytes = serde_json::to_vec_pretty(&envelope).map_err(|source| SaveError::Serialize {
        kind: T::KIND,
        source,
    })?;
    let path = T::KIND.path_in(dir);
    atomic_write(dir, &path, &bytes)?;
    Ok(path)
}

fn atomic_write(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), SaveError> {
    let write_err = |source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn encoder() -> LabelEncoder {
        LabelEncoder::fit(&["maize", "rice"]).unwrap()
    }

    #[test]
    fn save_then_load_keeps_stamp_and_value() {
        let dir = tempdir().unwrap();
        let stamp = RunStamp::new();
        let path = save_artifact(dir.path(), &stamp, &encoder()).unwrap();
        assert_eq!(path, dir.path().join("label_encoder.json"));

        let loaded = load_artifact::<LabelEncoder>(dir.path()).unwrap();
        assert_eq!(loaded.stamp, stamp);
        assert_eq!(loaded.value, encoder());
    }

    #[test]
    fn absent_file_is_missing() {
        let dir = tempdir().unwrap();
        let err = load_artifact::<StandardScaler>(dir.path()).unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn truncated_file_is_a_parse_failure() {
        let dir = tempdir().unwrap();
        let path = save_artifact(dir.path(), &RunStamp::new(), &encoder()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        let err = load_artifact::<LabelEncoder>(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Deserialize { .. }), "{err}");
        assert!(!err.is_missing());
    }

    #[test]
    fn kind_and_version_are_checked() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("model.json"),
            r#"{"format_version":1,"kind":"label_encoder","run_id":"00000000-0000-0000-0000-000000000000","trained_at":"x","payload":{"classes":["a"]}}"#,
        )
        .unwrap();
        let err = load_artifact::<RandomForest>(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::WrongKind {
                expected: ArtifactKind::Model,
                found: ArtifactKind::LabelEncoder,
                ..
            }
        ));

        std::fs::write(
            dir.path().join("label_encoder.json"),
            r#"{"format_version":9,"kind":"label_encoder","run_id":"00000000-0000-0000-0000-000000000000","trained_at":"x","payload":{"classes":["a"]}}"#,
        )
        .unwrap();
        let err = load_artifact::<LabelEncoder>(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedVersion { version: 9, .. }));
    }

    #[test]
    fn payload_validation_runs_after_parse() {
        let dir = tempdir().unwrap();
        let bad = LabelEncoder {
            classes: vec!["rice".into(), "apple".into()],
        };
        save_artifact(dir.path(), &RunStamp::new(), &bad).unwrap();
        let err = load_artifact::<LabelEncoder>(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Invalid { .. }));
    }

    #[test]
    fn file_names_are_fixed() {
        let names: Vec<&str> = ArtifactKind::ALL.iter().map(|k| k.file_name()).collect();
        assert_eq!(
            names,
            [
                "model.json",
                "standscaler.json",
                "minmaxscaler.json",
                "label_encoder.json"
            ]
        );
        assert!(!ArtifactKind::LabelEncoder.is_required());
        assert!(ArtifactKind::MinMaxScaler.is_required());
    }
}
