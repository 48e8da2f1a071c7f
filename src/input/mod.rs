mod file;
mod strokes;

pub use file::MaskFile;
pub use strokes::{Stroke, StrokeCanvas, DEFAULT_LINE_WIDTH};

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// Trait for stroke mask sources
pub trait MaskSource {
    /// Produce a mask covering a `width x height` image
    fn render_mask(&self, width: u32, height: u32) -> Result<RgbImage>;
}

/// Load the image to segment
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("Failed to load image from {}", path.display()))?;

    tracing::info!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );

    Ok(image)
}
