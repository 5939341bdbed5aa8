//! `croprec.toml` settings shared by the trainer and the serving binaries.
//!
//! Every field is optional. A missing file yields [`Settings::default`];
//! command-line flags override whatever is loaded here.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

/// File name of the settings file inside the app root.
pub const CONFIG_FILE_NAME: &str = "croprec.toml";

/// Errors raised while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read the settings file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write the settings file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize settings to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// A value is outside its accepted range.
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the artifact bundle. Defaults to `.croprec/artifacts`.
    pub artifact_dir: Option<PathBuf>,
    /// Illustrative image shown next to a recommendation.
    /// Defaults to `static/img.jpg` inside the artifact directory.
    pub image_path: Option<PathBuf>,
    pub training: TrainingSettings,
}

/// Training-flow options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    /// Dataset CSV used when `--dataset` is not passed.
    pub dataset: Option<PathBuf>,
    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the split and the forest.
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Integer-encode text labels and persist the encoder.
    pub encode_labels: bool,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            dataset: None,
            test_fraction: 0.2,
            seed: 42,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            encode_labels: true,
        }
    }
}

impl TrainingSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = self;
        if !(0.0..1.0).contains(&training.test_fraction) {
            return Err(ConfigError::InvalidValue {
                field: "training.test_fraction",
                reason: format!("{} is not in [0, 1)", training.test_fraction),
            });
        }
        if training.n_estimators == 0 {
            return Err(ConfigError::InvalidValue {
                field: "training.n_estimators",
                reason: "must be at least 1".to_string(),
            });
        }
        if training.min_samples_split < 2 {
            return Err(ConfigError::InvalidValue {
                field: "training.min_samples_split",
                reason: "must be at least 2".to_string(),
            });
        }
        if training.max_depth == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "training.max_depth",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }
}

impl Settings {
    /// Check value ranges that TOML typing cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.training.validate()
    }

    /// Artifact directory from the settings or the app-dir default.
    pub fn resolve_artifact_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.artifact_dir {
            Some(dir) => Ok(dir.clone()),
            None => app_dirs::default_artifact_dir().map_err(map_app_dir_error),
        }
    }

    /// Image path from the settings or `static/img.jpg` under `artifact_dir`.
    pub fn resolve_image_path(&self, artifact_dir: &Path) -> PathBuf {
        self.image_path
            .clone()
            .unwrap_or_else(|| artifact_dir.join("static").join("img.jpg"))
    }
}

/// Resolve the settings file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from the app root, returning defaults if the file is missing.
pub fn load_or_default() -> Result<Settings, ConfigError> {
    load_from(&config_path()?)
}

/// Load settings from `path`, returning defaults if it does not exist.
pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Write settings to `path` as TOML, replacing any previous file atomically.
pub fn save_to(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(text.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
