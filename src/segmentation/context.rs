use super::quantize::ColorQuantizer;
use image::{Rgb, RgbImage};

/// State shared by the stages of one segmentation run.
///
/// Borrowed by the histogram builder and the energy model; nothing outlives
/// the run.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    image: &'a RgbImage,
    quantizer: ColorQuantizer,
}

impl<'a> RunContext<'a> {
    pub fn new(image: &'a RgbImage, quantizer: ColorQuantizer) -> Self {
        Self { image, quantizer }
    }

    pub fn image(&self) -> &'a RgbImage {
        self.image
    }

    pub fn quantizer(&self) -> &ColorQuantizer {
        &self.quantizer
    }

    pub fn width(&self) -> usize {
        self.image.width() as usize
    }

    pub fn height(&self) -> usize {
        self.image.height() as usize
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// Color of a pixel addressed by its row-major index
    pub fn pixel(&self, index: usize) -> &'a Rgb<u8> {
        let width = self.width();
        let x = (index % width) as u32;
        let y = (index / width) as u32;
        self.image.get_pixel(x, y)
    }
}
