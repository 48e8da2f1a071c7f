mod context;
mod driver;
mod energy;
mod histogram;
mod preprocess;
mod prior;
mod quantize;
pub mod types;

pub use context::RunContext;
pub use driver::{
    DriverState, RoundReport, Segmentation, SegmentationConfig, Segmenter, DEFAULT_SEED,
};
pub use energy::{EnergyModel, EnergyParams};
pub use histogram::{StrokeClass, StrokeHistogram};
pub use preprocess::{check_mask, composite, labels_to_mask, to_color_image};
pub use prior::{PriorField, PriorModel};
pub use quantize::{BucketCoords, ColorQuantizer, DEFAULT_RESOLUTION, MAX_RESOLUTION};
pub use types::{Label, Result, SegmentationError};

use image::{DynamicImage, RgbImage};

/// Segment with the default configuration
pub fn segment(image: &DynamicImage, mask: &RgbImage) -> Result<Segmentation> {
    Segmenter::default().segment(image, mask)
}
