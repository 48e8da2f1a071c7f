use super::OutputSink;
use crate::segmentation::Segmentation;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Writes the composited image (foreground kept, background black)
pub struct ImageFileOutput {
    path: PathBuf,
}

impl ImageFileOutput {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl OutputSink for ImageFileOutput {
    fn write(&mut self, segmentation: &Segmentation) -> Result<()> {
        segmentation
            .image
            .save(&self.path)
            .with_context(|| format!("Failed to write result to {}", self.path.display()))?;

        tracing::info!("Wrote segmented image to {}", self.path.display());
        Ok(())
    }
}

/// Writes the labelling as a grayscale mask, 255 foreground / 0 background
pub struct LabelMaskOutput {
    path: PathBuf,
}

impl LabelMaskOutput {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl OutputSink for LabelMaskOutput {
    fn write(&mut self, segmentation: &Segmentation) -> Result<()> {
        segmentation
            .label_mask()
            .save(&self.path)
            .with_context(|| format!("Failed to write label mask to {}", self.path.display()))?;

        tracing::info!("Wrote label mask to {}", self.path.display());
        Ok(())
    }
}
