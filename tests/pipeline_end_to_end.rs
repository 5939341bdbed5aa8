mod support;

use std::path::{Path, PathBuf};

use croprec::artifacts::{ArtifactKind, ArtifactState};
use croprec::config::{self, Settings, TrainingSettings};
use croprec::pipeline::{DecodeSource, Decoded, PipelineError};
use croprec::schema::FeatureVector;
use croprec::serving::{ServeError, ServingContext};
use croprec::training::train_and_save;
use croprec::ui::form::FormState;
use support::croprec_env::CroprecEnvGuard;
use support::crops::{RICE_SAMPLE, numeric_label, write_csv};
use tempfile::TempDir;

fn settings() -> TrainingSettings {
    TrainingSettings {
        n_estimators: 25,
        ..TrainingSettings::default()
    }
}

/// Train on a synthetic dataset and return the artifact directory.
fn trained_bundle(
    temp: &TempDir,
    name: &str,
    label_for: impl Fn(&str) -> String,
    settings: &TrainingSettings,
) -> PathBuf {
    let csv_path = temp.path().join(format!("{name}.csv"));
    write_csv(&csv_path, 30, label_for);
    let out = temp.path().join(name);
    train_and_save(&csv_path, &out, settings).expect("training succeeds");
    out
}

fn rice() -> FeatureVector {
    FeatureVector::new(RICE_SAMPLE)
}

fn recommend(dir: &Path) -> Result<Decoded, ServeError> {
    ServingContext::load(dir)
        .recommend(&rice())
        .map(|rec| rec.decoded)
}

#[test]
fn text_labels_decode_through_the_encoder() {
    let temp = tempfile::tempdir().unwrap();
    let dir = trained_bundle(&temp, "text", str::to_string, &settings());
    assert!(dir.join("label_encoder.json").is_file());
    assert_eq!(
        recommend(&dir).unwrap(),
        Decoded::Crop {
            name: "Rice".into(),
            source: DecodeSource::Encoder
        }
    );
}

#[test]
fn unencoded_text_labels_decode_directly() {
    let temp = tempfile::tempdir().unwrap();
    let settings = TrainingSettings {
        encode_labels: false,
        ..settings()
    };
    let dir = trained_bundle(&temp, "labels", str::to_string, &settings);
    assert!(!dir.join("label_encoder.json").exists());
    assert_eq!(
        recommend(&dir).unwrap(),
        Decoded::Crop {
            name: "Rice".into(),
            source: DecodeSource::Label
        }
    );
}

#[test]
fn numeric_labels_use_the_fallback_table() {
    let temp = tempfile::tempdir().unwrap();
    let dir = trained_bundle(&temp, "numeric", numeric_label, &settings());
    let ctx = ServingContext::load(&dir);
    assert_eq!(
        ctx.statuses()
            .iter()
            .find(|s| s.kind == ArtifactKind::LabelEncoder)
            .map(|s| s.state.clone()),
        Some(ArtifactState::Missing)
    );
    let rec = ctx.recommend(&rice()).unwrap();
    assert_eq!(rec.decoded.to_string(), "Rice");
    assert_eq!(
        rec.decoded,
        Decoded::Crop {
            name: "Rice".into(),
            source: DecodeSource::Table
        }
    );
}

#[test]
fn index_outside_the_table_is_unknown() {
    let temp = tempfile::tempdir().unwrap();
    let label_for = |label: &str| {
        if label == "rice" {
            "23".to_string()
        } else {
            numeric_label(label)
        }
    };
    let dir = trained_bundle(&temp, "unknown", label_for, &settings());
    let decoded = recommend(&dir).unwrap();
    assert!(decoded.is_unknown());
    assert_eq!(decoded.to_string(), "unknown");
}

#[test]
fn missing_model_blocks_inference() {
    let temp = tempfile::tempdir().unwrap();
    let dir = trained_bundle(&temp, "no_model", str::to_string, &settings());
    std::fs::remove_file(dir.join("model.json")).unwrap();

    let ctx = ServingContext::load(&dir);
    assert!(ctx.warnings().is_empty());
    assert_eq!(
        ctx.recommend(&rice()).unwrap_err(),
        ServeError::Unavailable(PipelineError::MissingArtifact(vec![ArtifactKind::Model]))
    );
}

#[test]
fn truncated_scaler_warns_and_blocks_inference() {
    let temp = tempfile::tempdir().unwrap();
    let dir = trained_bundle(&temp, "truncated", str::to_string, &settings());
    let path = dir.join("standscaler.json");
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 3]).unwrap();

    let ctx = ServingContext::load(&dir);
    assert_eq!(ctx.warnings().len(), 1);
    assert!(ctx.warnings()[0].contains("standscaler.json"));
    assert!(matches!(
        ctx.recommend(&rice()),
        Err(ServeError::Unavailable(PipelineError::MissingArtifact(kinds)))
            if kinds == vec![ArtifactKind::StandardScaler]
    ));
}

#[test]
fn artifacts_from_different_runs_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let first = trained_bundle(&temp, "first", str::to_string, &settings());
    let second = trained_bundle(&temp, "second", str::to_string, &settings());
    std::fs::copy(second.join("model.json"), first.join("model.json")).unwrap();

    let ctx = ServingContext::load(&first);
    assert!(ctx.statuses().iter().all(|s| s.state == ArtifactState::Loaded));
    assert!(ctx.warnings().is_empty());
    assert!(matches!(
        ctx.unavailable_reason(),
        Some(PipelineError::RunMismatch { .. })
    ));
    assert!(matches!(
        ctx.recommend(&rice()),
        Err(ServeError::Unavailable(PipelineError::RunMismatch { .. }))
    ));

    let mut form = FormState::default();
    form.submit(&ctx);
    let line = form.result_line().unwrap();
    assert!(line.starts_with("Artifact files do not belong together"));
    assert!(line.contains("comes from run"));
}

#[test]
fn retraining_is_deterministic_for_a_seed() {
    let temp = tempfile::tempdir().unwrap();
    let a = trained_bundle(&temp, "a", str::to_string, &settings());
    let b = trained_bundle(&temp, "b", str::to_string, &settings());
    let payload = |dir: &Path| {
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.join("model.json")).unwrap()).unwrap();
        value["payload"].clone()
    };
    assert_eq!(payload(&a), payload(&b));
}

#[test]
fn config_home_controls_the_default_artifact_dir() {
    let temp = tempfile::tempdir().unwrap();
    let _env = CroprecEnvGuard::set_config_home(temp.path().join("config"));

    let settings = config::load_or_default().unwrap();
    assert_eq!(settings, Settings::default());
    let artifact_dir = settings.resolve_artifact_dir().unwrap();
    assert!(artifact_dir.starts_with(temp.path().join("config")));

    let ctx = ServingContext::load(&artifact_dir);
    assert!(!ctx.is_ready());
    assert_eq!(
        settings.resolve_image_path(&artifact_dir),
        artifact_dir.join("static").join("img.jpg")
    );
}
