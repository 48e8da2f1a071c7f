use super::MaskSource;
use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Stroke mask painted ahead of time and stored as an image file
pub struct MaskFile {
    path: PathBuf,
}

impl MaskFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MaskSource for MaskFile {
    fn render_mask(&self, width: u32, height: u32) -> Result<RgbImage> {
        let mask = image::open(&self.path)
            .with_context(|| format!("Failed to load mask from {}", self.path.display()))?
            .to_rgb8();

        if mask.dimensions() != (width, height) {
            bail!(
                "Mask {} is {}x{} but the image is {}x{}",
                self.path.display(),
                mask.width(),
                mask.height(),
                width,
                height
            );
        }

        tracing::debug!("Loaded mask from {}", self.path.display());
        Ok(mask)
    }
}
