use super::types::{Label, Result, SegmentationError};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Convert a source image into an 8-bit, 3-channel color image.
///
/// Grayscale is expanded and alpha is dropped. Gray+alpha and anything else
/// without 1, 3 or 4 channels is rejected.
pub fn to_color_image(image: &DynamicImage) -> Result<RgbImage> {
    let channels = image.color().channel_count();
    match channels {
        1 | 3 | 4 => Ok(image.to_rgb8()),
        _ => Err(SegmentationError::UnsupportedChannelLayout { channels }),
    }
}

/// Reject a stroke mask that does not match the image pixel for pixel
pub fn check_mask(image: &RgbImage, mask: &RgbImage) -> Result<()> {
    if image.dimensions() != mask.dimensions() {
        let (width, height) = image.dimensions();
        let (mask_width, mask_height) = mask.dimensions();
        return Err(SegmentationError::DimensionMismatch {
            width,
            height,
            mask_width,
            mask_height,
        });
    }
    Ok(())
}

/// Keep foreground pixels, paint background pixels black
pub fn composite(image: &RgbImage, labels: &[Label]) -> RgbImage {
    let width = image.width();
    RgbImage::from_fn(width, image.height(), |x, y| {
        let idx = (y * width + x) as usize;
        match labels[idx] {
            Label::Foreground => *image.get_pixel(x, y),
            Label::Background => Rgb([0, 0, 0]),
        }
    })
}

/// Render labels as a grayscale mask, 255 for foreground
pub fn labels_to_mask(labels: &[Label], width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        match labels[idx] {
            Label::Foreground => Luma([255]),
            Label::Background => Luma([0]),
        }
    })
}
