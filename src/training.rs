//! Offline training flow: encode labels, split, fit both scalers, fit the
//! forest, score the held-out rows and persist the bundle.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::artifacts::{RunStamp, SaveError, TrainedArtifacts, save_bundle};
use crate::config::{ConfigError, TrainingSettings};
use crate::dataset::{CropDataset, DatasetError, Labels, load_csv, train_test_split};
use crate::ml::forest::{ClassSet, ForestError, TrainOptions, encode_targets, train_forest};
use crate::ml::label_encoder::EncoderError;
use crate::ml::metrics::{ClassStats, ConfusionMatrix};
use crate::ml::scaler::ScalerError;
use crate::ml::{
    LabelEncoder, MinMaxScaler, RandomForest, StandardScaler, Transform, feature_matrix,
};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Settings(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("dataset has no rows to train on")]
    EmptyDataset,
    #[error("dataset has {rows} feature rows but {labels} labels")]
    MismatchedLabels { rows: usize, labels: usize },
    #[error("label encoding failed: {0}")]
    Encoder(#[from] EncoderError),
    #[error("scaler fit failed: {0}")]
    Scaler(#[from] ScalerError),
    #[error("forest training failed: {0}")]
    Forest(#[from] ForestError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// Held-out evaluation of a freshly trained forest.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Display name per class position.
    pub class_names: Vec<String>,
    pub confusion: ConfusionMatrix,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> f32 {
        self.confusion.accuracy()
    }

    pub fn per_class(&self) -> Vec<ClassStats> {
        self.confusion.per_class()
    }
}

/// Result of one training run, before or after it is written to disk.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub artifacts: TrainedArtifacts,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when the held-out split is empty.
    pub report: Option<EvaluationReport>,
}

impl TrainingRun {
    /// Persist the bundle into `dir`.
    pub fn save(&self, dir: &Path) -> Result<Vec<PathBuf>, SaveError> {
        save_bundle(dir, &self.artifacts)
    }
}

struct Targets {
    classes: ClassSet,
    positions: Vec<usize>,
    encoder: Option<LabelEncoder>,
}

fn prepare_targets(labels: &Labels, encode_labels: bool) -> Result<Targets, TrainError> {
    match labels {
        Labels::Numeric(values) => {
            let (classes, positions) = encode_targets(values);
            Ok(Targets {
                classes: ClassSet::Indices(classes),
                positions,
                encoder: None,
            })
        }
        Labels::Text(values) if encode_labels => {
            let (encoder, encoded) = LabelEncoder::fit_transform(values)?;
            let (classes, positions) = encode_targets(&encoded);
            Ok(Targets {
                classes: ClassSet::Indices(classes),
                positions,
                encoder: Some(encoder),
            })
        }
        Labels::Text(values) => {
            let (classes, positions) = encode_targets(values);
            Ok(Targets {
                classes: ClassSet::Labels(classes),
                positions,
                encoder: None,
            })
        }
    }
}

fn class_names(classes: &ClassSet, encoder: Option<&LabelEncoder>) -> Vec<String> {
    (0..classes.len())
        .map(|pos| match (classes, encoder) {
            (ClassSet::Indices(values), Some(encoder)) => encoder
                .inverse_transform(values[pos])
                .map(str::to_string)
                .unwrap_or_else(|_| classes.name(pos)),
            _ => classes.name(pos),
        })
        .collect()
}

/// Run the full training flow on an in-memory dataset.
///
/// Scalers and the forest only ever see training rows; held-out rows are
/// transformed with the fitted scalers and scored afterwards.
pub fn train_pipeline(
    dataset: &CropDataset,
    settings: &TrainingSettings,
) -> Result<TrainingRun, TrainError> {
    settings.validate()?;
    if dataset.is_empty() {
        return Err(TrainError::EmptyDataset);
    }
    if dataset.labels.len() != dataset.len() {
        return Err(TrainError::MismatchedLabels {
            rows: dataset.len(),
            labels: dataset.labels.len(),
        });
    }

    let targets = prepare_targets(&dataset.labels, settings.encode_labels)?;
    let split = train_test_split(dataset.len(), settings.test_fraction, settings.seed);
    info!(
        train = split.train.len(),
        test = split.test.len(),
        classes = targets.classes.len(),
        encoded = targets.encoder.is_some(),
        "Prepared training split"
    );

    let train_rows: Vec<_> = split.train.iter().map(|&i| dataset.features[i]).collect();
    let train_y: Vec<usize> = split.train.iter().map(|&i| targets.positions[i]).collect();
    let x_train = feature_matrix(&train_rows);

    let minmax = MinMaxScaler::fit(x_train.view())?;
    let x_minmax = minmax.transform(x_train.view())?;
    let standard = StandardScaler::fit(x_minmax.view())?;
    let x_scaled = standard.transform(x_minmax.view())?;

    let options = TrainOptions {
        n_estimators: settings.n_estimators,
        max_depth: settings.max_depth,
        min_samples_split: settings.min_samples_split,
        seed: settings.seed,
    };
    let model = train_forest(x_scaled.view(), &train_y, targets.classes.clone(), &options)?;
    info!(trees = model.trees.len(), "Trained random forest");

    let report = if split.test.is_empty() {
        None
    } else {
        let test_rows: Vec<_> = split.test.iter().map(|&i| dataset.features[i]).collect();
        let test_y: Vec<usize> = split.test.iter().map(|&i| targets.positions[i]).collect();
        Some(evaluate(
            &model,
            &minmax,
            &standard,
            &test_rows,
            &test_y,
            class_names(&targets.classes, targets.encoder.as_ref()),
        )?)
    };
    if let Some(report) = &report {
        info!(accuracy = report.accuracy(), "Held-out evaluation finished");
    }

    Ok(TrainingRun {
        artifacts: TrainedArtifacts {
            stamp: RunStamp::new(),
            model,
            minmax,
            standard,
            encoder: targets.encoder,
        },
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        report,
    })
}

fn evaluate(
    model: &RandomForest,
    minmax: &MinMaxScaler,
    standard: &StandardScaler,
    rows: &[crate::schema::FeatureVector],
    truth: &[usize],
    class_names: Vec<String>,
) -> Result<EvaluationReport, TrainError> {
    let x = standard.transform(minmax.transform(feature_matrix(rows).view())?.view())?;
    let mut confusion = ConfusionMatrix::new(model.classes.len());
    for (row, &expected) in x.rows().into_iter().zip(truth) {
        let row: Vec<f64> = row.iter().copied().collect();
        confusion.add(expected, model.predict_position(&row)?);
    }
    Ok(EvaluationReport {
        class_names,
        confusion,
    })
}

/// Load `dataset_path`, train and write the bundle into `out_dir`.
pub fn train_and_save(
    dataset_path: &Path,
    out_dir: &Path,
    settings: &TrainingSettings,
) -> Result<TrainingRun, TrainError> {
    let dataset = load_csv(dataset_path)?;
    let run = train_pipeline(&dataset, settings)?;
    run.save(out_dir)?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureVector;

    fn two_crop_dataset(labels: Labels) -> CropDataset {
        let mut features = Vec::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.5;
            features.push(FeatureVector::new([
                90.0 + jitter,
                42.0,
                43.0,
                21.0,
                82.0,
                6.5,
                200.0 + jitter,
            ]));
            features.push(FeatureVector::new([
                20.0 + jitter,
                67.0,
                20.0,
                18.0,
                16.0,
                7.0,
                80.0 + jitter,
            ]));
        }
        CropDataset { features, labels }
    }

    fn text_labels() -> Labels {
        Labels::Text(
            (0..20)
                .map(|i| if i % 2 == 0 { "rice" } else { "chickpea" }.to_string())
                .collect(),
        )
    }

    fn small_settings() -> TrainingSettings {
        TrainingSettings {
            n_estimators: 10,
            ..TrainingSettings::default()
        }
    }

    #[test]
    fn text_labels_produce_an_encoder() {
        let run = train_pipeline(&two_crop_dataset(text_labels()), &small_settings()).unwrap();
        let encoder = run.artifacts.encoder.as_ref().unwrap();
        assert_eq!(encoder.classes, vec!["chickpea", "rice"]);
        assert_eq!(run.artifacts.model.classes, ClassSet::Indices(vec![0, 1]));
        assert_eq!(run.test_rows, 4);
        assert_eq!(run.train_rows, 16);
        let report = run.report.unwrap();
        assert_eq!(report.class_names, vec!["chickpea", "rice"]);
        assert_eq!(report.confusion.total(), 4);
        assert!((report.accuracy() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disabled_encoding_keeps_string_classes() {
        let settings = TrainingSettings {
            encode_labels: false,
            ..small_settings()
        };
        let run = train_pipeline(&two_crop_dataset(text_labels()), &settings).unwrap();
        assert!(run.artifacts.encoder.is_none());
        assert_eq!(
            run.artifacts.model.classes,
            ClassSet::Labels(vec!["chickpea".into(), "rice".into()])
        );
    }

    #[test]
    fn numeric_labels_skip_the_encoder() {
        let labels = Labels::Numeric((0..20).map(|i| if i % 2 == 0 { 1 } else { 21 }).collect());
        let run = train_pipeline(&two_crop_dataset(labels), &small_settings()).unwrap();
        assert!(run.artifacts.encoder.is_none());
        assert_eq!(run.artifacts.model.classes, ClassSet::Indices(vec![1, 21]));
    }

    #[test]
    fn scalers_see_only_training_rows() {
        let mut dataset = two_crop_dataset(text_labels());
        let settings = small_settings();
        let split = train_test_split(dataset.len(), settings.test_fraction, settings.seed);
        // An extreme held-out value must not widen the fitted range.
        dataset.features[split.test[0]].0[0] = 10_000.0;
        let run = train_pipeline(&dataset, &settings).unwrap();
        assert!(run.artifacts.minmax.data_max[0] < 10_000.0);
    }

    #[test]
    fn zero_test_fraction_skips_evaluation() {
        let settings = TrainingSettings {
            test_fraction: 0.0,
            ..small_settings()
        };
        let run = train_pipeline(&two_crop_dataset(text_labels()), &settings).unwrap();
        assert!(run.report.is_none());
        assert_eq!(run.train_rows, 20);
    }

    #[test]
    fn rejects_empty_dataset_and_bad_settings() {
        let empty = CropDataset {
            features: Vec::new(),
            labels: Labels::Text(Vec::new()),
        };
        assert!(matches!(
            train_pipeline(&empty, &small_settings()),
            Err(TrainError::EmptyDataset)
        ));
        let settings = TrainingSettings {
            test_fraction: 1.5,
            ..small_settings()
        };
        assert!(matches!(
            train_pipeline(&two_crop_dataset(text_labels()), &settings),
            Err(TrainError::Settings(_))
        ));
    }

    #[test]
    fn label_count_must_match_rows() {
        let dataset = two_crop_dataset(Labels::Text(vec!["rice".into(), "maize".into()]));
        let err = train_pipeline(&dataset, &small_settings()).unwrap_err();
        assert!(matches!(
            err,
            TrainError::MismatchedLabels {
                rows: 20,
                labels: 2
            }
        ));
    }

    #[test]
    fn train_and_save_writes_the_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("crops.csv");
        let mut csv = String::from("N,P,K,temperature,humidity,ph,rainfall,label\n");
        for i in 0..6 {
            csv.push_str(&format!("{},42,43,21,82,6.5,200,rice\n", 85 + i));
            csv.push_str(&format!("{},67,20,18,16,7.0,80,chickpea\n", 20 + i));
        }
        std::fs::write(&csv_path, csv).unwrap();

        let out = dir.path().join("artifacts");
        train_and_save(&csv_path, &out, &small_settings()).unwrap();
        for name in [
            "model.json",
            "minmaxscaler.json",
            "standscaler.json",
            "label_encoder.json",
        ] {
            assert!(out.join(name).is_file(), "{name} not written");
        }
    }
}
