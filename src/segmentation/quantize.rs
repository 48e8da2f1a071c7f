use super::types::{Result, SegmentationError};
use image::Rgb;

/// Default number of buckets per color axis
pub const DEFAULT_RESOLUTION: usize = 25;

/// Largest useful resolution: one bucket per 8-bit channel value
pub const MAX_RESOLUTION: usize = 256;

/// Axis indices of one cell of the quantized color cube.
///
/// Stored blue-major to match the bucket index layout
/// `index = b * R * R + g * R + r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketCoords {
    pub b: usize,
    pub g: usize,
    pub r: usize,
}

impl BucketCoords {
    pub fn new(b: usize, g: usize, r: usize) -> Self {
        Self { b, g, r }
    }

    /// Squared Euclidean distance in bucket space
    pub fn distance2(&self, other: &BucketCoords) -> usize {
        let db = self.b.abs_diff(other.b);
        let dg = self.g.abs_diff(other.g);
        let dr = self.r.abs_diff(other.r);
        db * db + dg * dg + dr * dr
    }
}

/// Maps 8-bit colors onto an `R x R x R` grid of buckets and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorQuantizer {
    resolution: usize,
}

impl Default for ColorQuantizer {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl ColorQuantizer {
    pub fn new(resolution: usize) -> Result<Self> {
        if resolution == 0 || resolution > MAX_RESOLUTION {
            return Err(SegmentationError::InvalidConfig(format!(
                "color resolution must be in 1..={}, got {}",
                MAX_RESOLUTION, resolution
            )));
        }
        Ok(Self { resolution })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Number of buckets in the full cube
    pub fn bucket_count(&self) -> usize {
        self.resolution * self.resolution * self.resolution
    }

    /// Bucket coordinates of an RGB pixel, `floor(channel / 256 * R)` per axis.
    pub fn quantize(&self, pixel: &Rgb<u8>) -> BucketCoords {
        let [r, g, b] = pixel.0;
        BucketCoords {
            b: self.axis(b),
            g: self.axis(g),
            r: self.axis(r),
        }
    }

    /// Bucket index of an RGB pixel
    pub fn bucket_of(&self, pixel: &Rgb<u8>) -> usize {
        self.to_index(self.quantize(pixel))
    }

    pub fn to_index(&self, coords: BucketCoords) -> usize {
        let res = self.resolution;
        coords.b * res * res + coords.g * res + coords.r
    }

    pub fn from_index(&self, index: usize) -> BucketCoords {
        let res = self.resolution;
        let b = index / res / res;
        let g = (index - b * res * res) / res;
        let r = index % res;
        BucketCoords { b, g, r }
    }

    // Integer form of floor(value / 256 * R); exact at bucket edges.
    fn axis(&self, value: u8) -> usize {
        value as usize * self.resolution / 256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_over_the_whole_cube() {
        let quantizer = ColorQuantizer::default();
        for index in 0..quantizer.bucket_count() {
            assert_eq!(quantizer.to_index(quantizer.from_index(index)), index);
        }
    }

    #[test]
    fn decoding_is_blue_major() {
        let quantizer = ColorQuantizer::default();
        assert_eq!(quantizer.from_index(1), BucketCoords::new(0, 0, 1));
        assert_eq!(quantizer.from_index(25), BucketCoords::new(0, 1, 0));
        assert_eq!(quantizer.from_index(625), BucketCoords::new(1, 0, 0));
        assert_eq!(quantizer.from_index(15624), BucketCoords::new(24, 24, 24));
    }

    #[test]
    fn channel_extremes_stay_inside_the_cube() {
        let quantizer = ColorQuantizer::default();
        assert_eq!(quantizer.quantize(&Rgb([0, 0, 0])), BucketCoords::new(0, 0, 0));
        assert_eq!(
            quantizer.quantize(&Rgb([255, 255, 255])),
            BucketCoords::new(24, 24, 24)
        );
    }

    #[test]
    fn quantize_reads_channels_as_rgb() {
        let quantizer = ColorQuantizer::default();
        assert_eq!(quantizer.quantize(&Rgb([255, 0, 0])), BucketCoords::new(0, 0, 24));
        assert_eq!(quantizer.quantize(&Rgb([0, 255, 0])), BucketCoords::new(0, 24, 0));
        assert_eq!(quantizer.quantize(&Rgb([0, 0, 255])), BucketCoords::new(24, 0, 0));
    }

    #[test]
    fn quantize_is_deterministic() {
        let quantizer = ColorQuantizer::default();
        for v in 0..=255u8 {
            let pixel = Rgb([v, v.wrapping_mul(7), 255 - v]);
            let first = quantizer.quantize(&pixel);
            for _ in 0..3 {
                assert_eq!(quantizer.quantize(&pixel), first);
            }
        }
    }

    #[test]
    fn low_bucket_edges_map_to_their_own_bucket() {
        // Resolutions dividing 256 have exact integer edges.
        for res in [1usize, 2, 4, 8, 16, 32, 64, 128, 256] {
            let quantizer = ColorQuantizer::new(res).unwrap();
            let width = 256 / res;
            for i in 0..res {
                let edge = (width * i) as u8;
                let coords = quantizer.quantize(&Rgb([edge, edge, edge]));
                assert_eq!(coords, BucketCoords::new(i, i, i), "res={res} i={i}");
            }
        }
    }

    #[test]
    fn first_value_of_each_bucket_at_default_resolution() {
        let quantizer = ColorQuantizer::default();
        for i in 0..DEFAULT_RESOLUTION {
            // smallest v with v * 25 >= 256 * i
            let edge = (256 * i).div_ceil(DEFAULT_RESOLUTION) as u8;
            assert_eq!(quantizer.quantize(&Rgb([edge, 0, 0])).r, i);
            if edge > 0 {
                assert_eq!(quantizer.quantize(&Rgb([edge - 1, 0, 0])).r, i - 1);
            }
        }
    }

    #[test]
    fn rejects_out_of_range_resolution() {
        assert!(ColorQuantizer::new(0).is_err());
        assert!(ColorQuantizer::new(257).is_err());
        assert!(ColorQuantizer::new(256).is_ok());
    }

    #[test]
    fn distance_is_symmetric() {
        let a = BucketCoords::new(1, 5, 3);
        let b = BucketCoords::new(4, 1, 3);
        assert_eq!(a.distance2(&b), 9 + 16);
        assert_eq!(b.distance2(&a), a.distance2(&b));
    }
}
