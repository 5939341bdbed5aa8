//! Desktop recommendation form built on eframe/egui.

mod app;
pub mod form;
mod illustration;
mod style;

use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui;

pub use app::{LaunchError, RecommendApp};

use crate::serving::ServingContext;

pub const WINDOW_TITLE: &str = "Crop Recommendation";

/// Open the recommendation window and block until it closes.
pub fn run(serving: Arc<ServingContext>, image_path: PathBuf) -> eframe::Result<()> {
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([640.0, 720.0])
        .with_min_inner_size([420.0, 480.0]);
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        WINDOW_TITLE,
        native_options,
        Box::new(move |cc| Ok(Box::new(RecommendApp::new(cc, serving, image_path)))),
    )
}

/// Show only a startup error message.
pub fn run_launch_error(message: String) -> eframe::Result<()> {
    eframe::run_native(
        WINDOW_TITLE,
        eframe::NativeOptions::default(),
        Box::new(move |_cc| Ok(Box::new(LaunchError { message }))),
    )
}
