use super::context::RunContext;
use image::{Rgb, RgbImage};
use std::collections::BTreeMap;

/// Class of a stroke mask pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeClass {
    Unmarked,
    Foreground,
    Background,
}

impl StrokeClass {
    /// Classify a mask pixel by color proximity.
    ///
    /// Pure white is unmarked, bluish is foreground, reddish is background.
    /// Anything else is treated as unmarked. The foreground rule is tested
    /// first, so dark pixels count as foreground.
    pub fn classify(pixel: &Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        if r == 255 && g == 255 && b == 255 {
            StrokeClass::Unmarked
        } else if g < 200 && r < 200 {
            StrokeClass::Foreground
        } else if b < 200 && g < 200 {
            StrokeClass::Background
        } else {
            StrokeClass::Unmarked
        }
    }
}

/// Sparse per-bucket stroke counts.
///
/// A bucket never touched by a stroke is absent from both maps.
#[derive(Debug, Clone, Default)]
pub struct StrokeHistogram {
    foreground: BTreeMap<usize, f64>,
    total: BTreeMap<usize, f64>,
}

impl StrokeHistogram {
    /// Scan the mask against the run's source image.
    ///
    /// The caller guarantees the mask has the image's dimensions.
    pub fn build(ctx: &RunContext<'_>, mask: &RgbImage) -> Self {
        let _span = tracing::debug_span!("histogram").entered();

        let quantizer = ctx.quantizer();
        let mut histogram = Self::default();

        for (pixel, mark) in ctx.image().pixels().zip(mask.pixels()) {
            match StrokeClass::classify(mark) {
                StrokeClass::Foreground => {
                    let bucket = quantizer.bucket_of(pixel);
                    *histogram.foreground.entry(bucket).or_insert(0.0) += 1.0;
                    *histogram.total.entry(bucket).or_insert(0.0) += 1.0;
                }
                StrokeClass::Background => {
                    let bucket = quantizer.bucket_of(pixel);
                    *histogram.total.entry(bucket).or_insert(0.0) += 1.0;
                }
                StrokeClass::Unmarked => {}
            }
        }

        tracing::debug!(
            "Stroke histogram covers {} buckets ({} with foreground)",
            histogram.total.len(),
            histogram.foreground.len()
        );

        histogram
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }

    /// Number of buckets observed by any stroke
    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn foreground_count(&self, bucket: usize) -> Option<f64> {
        if self.total.contains_key(&bucket) {
            Some(self.foreground.get(&bucket).copied().unwrap_or(0.0))
        } else {
            None
        }
    }

    pub fn total_count(&self, bucket: usize) -> Option<f64> {
        self.total.get(&bucket).copied()
    }

    /// Foreground fraction `fg / total` of every observed bucket
    pub fn fractions(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.total.iter().map(move |(&bucket, &total)| {
            let fg = self.foreground.get(&bucket).copied().unwrap_or(0.0);
            (bucket, fg / total)
        })
    }

    /// Signed vote `fg - bg` of every observed bucket
    pub fn votes(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.total.iter().map(move |(&bucket, &total)| {
            let fg = self.foreground.get(&bucket).copied().unwrap_or(0.0);
            (bucket, fg - (total - fg))
        })
    }
}
