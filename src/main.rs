//! Entry point for the crop recommendation desktop UI.
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

use std::path::PathBuf;

use croprec::logging::{self, Console};
use croprec::serving::ServingContext;
use croprec::{config, ui};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init("app", Console::Stdout) {
        eprintln!("Logging disabled: {err}");
    }

    match startup_paths() {
        Ok((artifact_dir, image_path)) => {
            let serving = ServingContext::load(&artifact_dir);
            ui::run(serving, image_path)?;
        }
        Err(message) => {
            tracing::error!("{message}");
            ui::run_launch_error(message)?;
        }
    }
    Ok(())
}

/// Artifact directory and image path from `--artifacts <dir>` or the config.
fn startup_paths() -> Result<(PathBuf, PathBuf), String> {
    let settings = config::load_or_default().map_err(|err| err.to_string())?;
    let mut args = std::env::args().skip(1);
    let mut artifact_dir = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--artifacts" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--artifacts requires a value".to_string())?;
                artifact_dir = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}")),
        }
    }
    let artifact_dir = match artifact_dir {
        Some(dir) => dir,
        None => settings
            .resolve_artifact_dir()
            .map_err(|err| err.to_string())?,
    };
    let image_path = settings.resolve_image_path(&artifact_dir);
    tracing::info!("Serving artifacts from {}", artifact_dir.display());
    Ok((artifact_dir, image_path))
}
