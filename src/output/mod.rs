mod file;

pub use file::{ImageFileOutput, LabelMaskOutput};

use crate::segmentation::Segmentation;
use anyhow::Result;

/// Trait for segmentation result destinations
pub trait OutputSink {
    /// Write one finished segmentation
    fn write(&mut self, segmentation: &Segmentation) -> Result<()>;
}
