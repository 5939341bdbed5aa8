use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui::{
    self, Align, Button, DragValue, Grid, Layout, RichText, TextureHandle, TextureOptions,
};

use super::form::{FormState, unavailable_message};
use super::illustration::Illustration;
use super::style;
use crate::artifacts::ArtifactState;
use crate::schema::FEATURE_COLUMNS;
use crate::serving::ServingContext;

const FORM_COLUMNS: usize = 3;
const IMAGE_WIDTH: f32 = 300.0;

pub struct RecommendApp {
    serving: Arc<ServingContext>,
    form: FormState,
    image_path: PathBuf,
    illustration: Option<Illustration>,
    texture: Option<TextureHandle>,
}

impl RecommendApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        serving: Arc<ServingContext>,
        image_path: PathBuf,
    ) -> Self {
        let mut visuals = cc.egui_ctx.style().visuals.clone();
        style::apply_visuals(&mut visuals);
        cc.egui_ctx.set_visuals(visuals);

        Self {
            serving,
            form: FormState::default(),
            image_path,
            illustration: None,
            texture: None,
        }
    }

    fn render_header(&self, ui: &mut egui::Ui) {
        let palette = style::palette();
        ui.vertical_centered(|ui| {
            ui.heading(
                RichText::new("Crop Recommendation System")
                    .size(28.0)
                    .color(palette.accent_green),
            );
        });
        ui.add_space(6.0);
        ui.label("Enter all the values below and click Get Recommendation.");
        if let Some(stamp) = self.serving.run_stamp() {
            ui.label(
                RichText::new(format!("Model trained {}", stamp.trained_at))
                    .small()
                    .color(palette.text_muted),
            );
        }
    }

    fn render_artifact_warnings(&self, ui: &mut egui::Ui) {
        let palette = style::palette();
        for warning in self.serving.warnings() {
            ui.colored_label(palette.warning, format!("Warning: {warning}"));
        }
        let Some(reason) = self.serving.unavailable_reason() else {
            return;
        };
        ui.add_space(6.0);
        ui.colored_label(palette.warning, unavailable_message(reason));
        ui.label(
            RichText::new(self.serving.artifact_dir().display().to_string())
                .color(palette.text_muted),
        );
        Grid::new("artifact_presence")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for status in self.serving.statuses() {
                    ui.label(status.kind.file_name());
                    match &status.state {
                        ArtifactState::Loaded => ui.label("present"),
                        ArtifactState::Missing => ui.label("missing"),
                        ArtifactState::Failed(_) => {
                            ui.colored_label(palette.warning, "unreadable")
                        }
                    };
                    ui.end_row();
                }
            });
    }

    fn render_form(&mut self, ui: &mut egui::Ui) {
        Grid::new("feature_inputs")
            .num_columns(FORM_COLUMNS)
            .spacing([18.0, 8.0])
            .show(ui, |ui| {
                for (idx, column) in FEATURE_COLUMNS.iter().enumerate() {
                    ui.vertical(|ui| {
                        ui.label(column.display);
                        ui.add(
                            DragValue::new(&mut self.form.values[idx])
                                .speed(column.step)
                                .max_decimals(2),
                        );
                    });
                    if (idx + 1) % FORM_COLUMNS == 0 {
                        ui.end_row();
                    }
                }
            });
        ui.add_space(10.0);
        let button = Button::new("Get Recommendation");
        if ui.add_enabled(self.serving.is_ready(), button).clicked() {
            self.form.submit(&self.serving);
        }
    }

    fn render_outcome(&mut self, ui: &mut egui::Ui) {
        let palette = style::palette();
        let Some(line) = self.form.result_line() else {
            return;
        };
        if !self.form.has_recommendation() {
            ui.colored_label(palette.warning, line);
            return;
        }
        ui.label(
            RichText::new(line)
                .strong()
                .size(18.0)
                .color(palette.accent_green),
        );
        ui.add_space(8.0);
        self.render_illustration(ui);
    }

    fn render_illustration(&mut self, ui: &mut egui::Ui) {
        let illustration = self
            .illustration
            .get_or_insert_with(|| Illustration::load(&self.image_path));
        match illustration {
            Illustration::Loaded(image) => {
                let texture = self.texture.get_or_insert_with(|| {
                    ui.ctx()
                        .load_texture("crop_illustration", image.clone(), TextureOptions::LINEAR)
                });
                let size = texture.size_vec2();
                let scale = (IMAGE_WIDTH / size.x).min(1.0);
                ui.add(egui::Image::new((texture.id(), size * scale)));
                ui.label(RichText::new("Crop Recommendation").small());
            }
            Illustration::Unavailable(notice) => {
                ui.label(RichText::new(notice.as_str()).italics());
            }
        }
    }
}

impl eframe::App for RecommendApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(Layout::top_down(Align::Min), |ui| {
                self.render_header(ui);
                self.render_artifact_warnings(ui);
                ui.separator();
                self.render_form(ui);
                ui.add_space(10.0);
                self.render_outcome(ui);
            });
        });
    }
}

/// Minimal fallback app to display startup errors.
pub struct LaunchError {
    pub message: String,
}

impl eframe::App for LaunchError {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Failed to start UI");
                ui.label(&self.message);
            });
        });
    }
}
