use std::path::Path;

use eframe::egui::ColorImage;

/// Decorative image shown next to a recommendation.
pub enum Illustration {
    Loaded(ColorImage),
    /// Notice shown in place of the image.
    Unavailable(String),
}

impl Illustration {
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            return Illustration::Unavailable(format!("Image not found: {}", path.display()));
        }
        match image::open(path) {
            Ok(image) => {
                let rgba = image.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                Illustration::Loaded(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
            }
            Err(err) => {
                tracing::warn!("Failed to decode {}: {err}", path.display());
                Illustration::Unavailable(format!("Image could not be shown: {}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_image_yields_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static").join("img.jpg");
        match Illustration::load(&path) {
            Illustration::Unavailable(notice) => assert!(notice.starts_with("Image not found")),
            Illustration::Loaded(_) => panic!("expected a notice"),
        }
    }

    #[test]
    fn undecodable_image_yields_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        assert!(matches!(
            Illustration::load(&path),
            Illustration::Unavailable(_)
        ));
    }

    #[test]
    fn png_decodes_to_color_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        match Illustration::load(&path) {
            Illustration::Loaded(image) => assert_eq!(image.size, [3, 2]),
            Illustration::Unavailable(notice) => panic!("{notice}"),
        }
    }
}
